//! Recursive-descent parser producing a statement list and expression AST.
//!
//! The parser mirrors the classic chibicc structure: one helper per
//! precedence level, with a thin statement layer on top. Identifiers are
//! resolved against a flat table of locals as they are consumed, so every
//! variable reference in the tree already carries its frame offset.
//!
//! ```text
//! program    = stmt*
//! stmt       = "return" expr ";"
//!            | "if" "(" expr ")" stmt ("else" stmt)?
//!            | expr ";"
//! expr       = assign
//! assign     = equality ("=" assign)?
//! equality   = relational ("==" relational | "!=" relational)*
//! relational = add ("<" add | "<=" add | ">" add | ">=" add)*
//! add        = mul ("+" mul | "-" mul)*
//! mul        = unary ("*" unary | "/" unary)*
//! unary      = ("+" | "-")? unary | primary
//! primary    = num | ident | "(" expr ")"
//! ```

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};

/// Size in bytes of one machine word; every local occupies one.
pub const WORD_SIZE: i64 = 8;

/// Binary operators recognised by the language.
///
/// `>` and `>=` have no variant: the parser swaps their operands and emits
/// `Lt` / `Le` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Eq => "==",
      BinaryOp::Ne => "!=",
      BinaryOp::Lt => "<",
      BinaryOp::Le => "<=",
    }
  }
}

/// Syntax tree produced by the parser. Statements and expressions share one
/// type; `Return` and `If` only ever appear in statement position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
  Num {
    value: i64,
  },
  Var {
    name: String,
    offset: i64,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  Assign {
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
    /// Byte offset of the `=` token.
    loc: usize,
  },
  Return {
    expr: Box<AstNode>,
  },
  If {
    cond: Box<AstNode>,
    then: Box<AstNode>,
    els: Option<Box<AstNode>>,
  },
}

impl AstNode {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn var(name: impl Into<String>, offset: i64) -> Self {
    Self::Var {
      name: name.into(),
      offset,
    }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn assign(lhs: AstNode, rhs: AstNode, loc: usize) -> Self {
    Self::Assign {
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
      loc,
    }
  }

  pub fn ret(expr: AstNode) -> Self {
    Self::Return {
      expr: Box::new(expr),
    }
  }

  pub fn if_else(cond: AstNode, then: AstNode, els: Option<AstNode>) -> Self {
    Self::If {
      cond: Box::new(cond),
      then: Box::new(then),
      els: els.map(Box::new),
    }
  }
}

/// One local variable and its slot below the frame base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
  pub name: String,
  pub offset: i64,
}

/// Append-only table of locals in the order they were first seen.
///
/// There is a single flat namespace: once a name has an offset it keeps it for
/// the rest of the program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Locals {
  vars: Vec<LocalVar>,
}

impl Locals {
  pub fn new() -> Self {
    Self::default()
  }

  /// Look a name up, most recently added first.
  pub fn find(&self, name: &str) -> Option<&LocalVar> {
    self.vars.iter().rev().find(|var| var.name == name)
  }

  /// Offset for `name`, allocating the next word-sized slot on first sight.
  pub fn resolve(&mut self, name: &str) -> i64 {
    if let Some(var) = self.find(name) {
      return var.offset;
    }

    let offset = self.vars.last().map_or(0, |var| var.offset) + WORD_SIZE;
    tracing::trace!(var = name, offset, "allocated local");
    self.vars.push(LocalVar {
      name: name.to_string(),
      offset,
    });
    offset
  }

  pub fn iter(&self) -> impl Iterator<Item = &LocalVar> {
    self.vars.iter()
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  /// Bytes of frame needed to hold every local.
  pub fn stack_size(&self) -> i64 {
    self.vars.last().map_or(0, |var| var.offset)
  }
}

/// Parsed program: top-level statements plus the locals they reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
  pub body: Vec<AstNode>,
  pub locals: Locals,
}

/// Parse a sequence of statements from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Program> {
  let mut stream = TokenStream::new(tokens, source);
  let mut body = Vec::new();

  while !stream.is_eof() {
    body.push(parse_stmt(&mut stream)?);
  }

  tracing::debug!(
    statements = body.len(),
    locals = stream.locals.len(),
    "parsed program"
  );
  Ok(Program {
    body,
    locals: stream.locals,
  })
}

fn parse_stmt(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.consume(TokenKind::Return) {
    let expr = parse_expr(stream)?;
    stream.skip(";")?;
    return Ok(AstNode::ret(expr));
  }

  if stream.consume(TokenKind::If) {
    stream.skip("(")?;
    let cond = parse_expr(stream)?;
    stream.skip(")")?;
    let then = parse_stmt(stream)?;
    // A trailing `else` always binds to the innermost open `if`.
    let els = if stream.consume(TokenKind::Else) {
      Some(parse_stmt(stream)?)
    } else {
      None
    };
    return Ok(AstNode::if_else(cond, then, els));
  }

  parse_expr_stmt(stream)
}

fn parse_expr_stmt(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let expr = parse_expr(stream)?;
  stream.skip(";")?;
  Ok(expr)
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_assign(stream)
}

fn parse_assign(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let node = parse_equality(stream)?;

  let loc = stream.loc();
  if stream.equal("=") {
    let rhs = parse_assign(stream)?;
    return Ok(AstNode::assign(node, rhs, loc));
  }

  Ok(node)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_relational(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("==") => BinaryOp::Eq,
      Some("!=") => BinaryOp::Ne,
      _ => break,
    };

    stream.advance();
    let rhs = parse_relational(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_add(stream)?;

  loop {
    let (op, swapped) = match stream.peek_punctuator() {
      Some("<") => (BinaryOp::Lt, false),
      Some("<=") => (BinaryOp::Le, false),
      Some(">") => (BinaryOp::Lt, true),
      Some(">=") => (BinaryOp::Le, true),
      _ => break,
    };

    stream.advance();
    let rhs = parse_add(stream)?;
    node = if swapped {
      AstNode::binary(op, rhs, node)
    } else {
      AstNode::binary(op, node, rhs)
    };
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_mul(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("+") => BinaryOp::Add,
      Some("-") => BinaryOp::Sub,
      _ => break,
    };

    stream.advance();
    let rhs = parse_mul(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_unary(stream)?;

  loop {
    let op = match stream.peek_punctuator() {
      Some("*") => BinaryOp::Mul,
      Some("/") => BinaryOp::Div,
      _ => break,
    };

    stream.advance();
    let rhs = parse_unary(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_unary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.equal("+") {
    return parse_unary(stream);
  }

  if stream.equal("-") {
    let operand = parse_unary(stream)?;
    return Ok(AstNode::binary(BinaryOp::Sub, AstNode::number(0), operand));
  }

  parse_primary(stream)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.equal("(") {
    let node = parse_expr(stream)?;
    stream.skip(")")?;
    return Ok(node);
  }

  let source = stream.source;
  let Some(token) = stream.peek().cloned() else {
    return Err(CompileError::syntax(
      source,
      source.len(),
      "expected number or identifier, but got EOF",
    ));
  };

  match token.kind {
    TokenKind::Num => {
      stream.advance();
      let value = token.value.ok_or_else(|| {
        CompileError::syntax(source, token.loc, "internal error: numeric token missing value")
      })?;
      Ok(AstNode::number(value))
    }
    TokenKind::Ident => {
      stream.advance();
      let name = token_text(&token, source);
      let offset = stream.locals.resolve(name);
      Ok(AstNode::var(name, offset))
    }
    _ => Err(CompileError::syntax(
      source,
      token.loc,
      format!(
        "expected number or identifier, but got {}",
        describe_token(Some(&token), source)
      ),
    )),
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
  /// Locals seen so far; identifiers resolve against this as they are consumed.
  locals: Locals,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
      locals: Locals::new(),
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  /// Byte offset of the current token, or the end of input past the last one.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  /// Text of the current token when it is a punctuator.
  fn peek_punctuator(&self) -> Option<&'a str> {
    self
      .peek()
      .filter(|token| token.kind == TokenKind::Punctuator)
      .map(|token| token_text(token, self.source))
  }

  /// Consume the current token if it matches the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if self.peek_punctuator() == Some(op) {
      self.pos += 1;
      return true;
    }
    false
  }

  /// Consume the current token if it has the given kind.
  fn consume(&mut self, kind: TokenKind) -> bool {
    if self.peek().is_some_and(|token| token.kind == kind) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, s: &str) -> CompileResult<()> {
    if self.equal(s) {
      Ok(())
    } else {
      let got = describe_token(self.peek(), self.source);
      Err(CompileError::syntax(
        self.source,
        self.loc(),
        format!("expected \"{s}\", but got {got}"),
      ))
    }
  }

  fn is_eof(&self) -> bool {
    matches!(
      self.peek().map(|token| token.kind),
      None | Some(TokenKind::Eof)
    )
  }
}
