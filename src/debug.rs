//! Human-readable dumps of the token stream and syntax tree.
//!
//! These only inspect data; the driver decides whether to print them.

use crate::parser::{AstNode, Program};
use crate::tokenizer::{Token, TokenKind, token_text};

fn kind_name(kind: TokenKind) -> &'static str {
  match kind {
    TokenKind::Punctuator => "PUNCT",
    TokenKind::Return => "RETURN",
    TokenKind::If => "IF",
    TokenKind::Else => "ELSE",
    TokenKind::Ident => "IDENT",
    TokenKind::Num => "NUM",
    TokenKind::Eof => "EOF",
  }
}

/// One line per token, e.g. `[0] NUM("12") val=12 ->`, then `END`.
pub fn dump_tokens(tokens: &[Token], source: &str) -> String {
  let mut out = String::new();
  for (i, token) in tokens.iter().enumerate() {
    out.push_str(&format!("[{i}] {}", kind_name(token.kind)));
    let text = token_text(token, source);
    if !text.is_empty() {
      out.push_str(&format!("({text:?})"));
    }
    if let Some(value) = token.value {
      out.push_str(&format!(" val={value}"));
    }
    out.push_str(" ->\n");
  }
  out.push_str("END\n");
  out
}

/// Tree rendering of every top-level statement.
pub fn dump_ast(program: &Program) -> String {
  let mut out = String::new();
  for stmt in &program.body {
    dump_node(stmt, "", true, &mut out);
  }
  out
}

fn dump_node(node: &AstNode, prefix: &str, is_tail: bool, out: &mut String) {
  let (connector, child_prefix) = if is_tail {
    ("└── ", format!("{prefix}    "))
  } else {
    ("├── ", format!("{prefix}│   "))
  };

  out.push_str(&format!("{prefix}{connector}{}\n", node_label(node)));

  let children = node_children(node);
  let last = children.len().saturating_sub(1);
  for (i, child) in children.into_iter().enumerate() {
    dump_node(child, &child_prefix, i == last, out);
  }
}

fn node_label(node: &AstNode) -> String {
  match node {
    AstNode::Num { value } => value.to_string(),
    AstNode::Var { name, offset } => format!("{name}@{offset}"),
    AstNode::Binary { op, .. } => format!("({})", op.symbol()),
    AstNode::Assign { .. } => "(=)".to_string(),
    AstNode::Return { .. } => "return".to_string(),
    AstNode::If { .. } => "if".to_string(),
  }
}

fn node_children(node: &AstNode) -> Vec<&AstNode> {
  match node {
    AstNode::Num { .. } | AstNode::Var { .. } => Vec::new(),
    AstNode::Binary { lhs, rhs, .. } | AstNode::Assign { lhs, rhs, .. } => vec![&**lhs, &**rhs],
    AstNode::Return { expr } => vec![&**expr],
    AstNode::If { cond, then, els } => {
      let mut children = vec![&**cond, &**then];
      children.extend(els.as_deref());
      children
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parser::parse;
  use crate::tokenizer::tokenize;

  #[test]
  fn tokens_dump() {
    let src = "a = 12;";
    let tokens = tokenize(src).unwrap();
    assert_eq!(
      dump_tokens(&tokens, src),
      "[0] IDENT(\"a\") ->\n\
       [1] PUNCT(\"=\") ->\n\
       [2] NUM(\"12\") val=12 ->\n\
       [3] PUNCT(\";\") ->\n\
       [4] EOF ->\n\
       END\n"
    );
  }

  #[test]
  fn ast_dump() {
    let src = "x = 1 + 2 * 3; if (x) return x; else return 0;";
    let program = parse(tokenize(src).unwrap(), src).unwrap();
    let expected = "\
└── (=)
    ├── x@8
    └── (+)
        ├── 1
        └── (*)
            ├── 2
            └── 3
└── if
    ├── x@8
    ├── return
    │   └── x@8
    └── return
        └── 0
";
    assert_eq!(dump_ast(&program), expected);
  }
}
