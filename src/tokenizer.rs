//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer walks the input character by character so that offsets stay
//! on character boundaries even for non-ASCII text, while every offset it
//! records is a byte offset into the source. Identifiers are scanned greedily
//! and then looked up in the keyword table; multi-character punctuators are
//! matched before single-character ones to avoid ambiguity.

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Punctuator,
  Return,
  If,
  Else,
  Ident,
  Num,
  Eof,
}

/// Reserved words. Anything else that looks like an identifier stays one.
const KEYWORDS: [(&str, TokenKind); 3] = [
  ("return", TokenKind::Return),
  ("if", TokenKind::If),
  ("else", TokenKind::Else),
];

const TWO_CHAR_PUNCTUATORS: [&str; 4] = ["==", "!=", "<=", ">="];

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

fn keyword_kind(word: &str) -> Option<TokenKind> {
  KEYWORDS
    .iter()
    .find(|(keyword, _)| *keyword == word)
    .map(|(_, kind)| *kind)
}

fn is_single_punctuator(c: char) -> bool {
  matches!(
    c,
    '+' | '-' | '*' | '/' | '=' | '(' | ')' | ';' | '<' | '>'
  )
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let chars: Vec<(usize, char)> = input.char_indices().collect();
  // Byte offset where the character at `idx` starts, or the end of input.
  let byte_at = |idx: usize| chars.get(idx).map_or(input.len(), |&(loc, _)| loc);

  let mut tokens = Vec::new();
  let mut i = 0;

  while i < chars.len() {
    let (loc, c) = chars[i];

    if matches!(c, ' ' | '\t' | '\n' | '\r') {
      i += 1;
      continue;
    }

    if c.is_ascii_digit() {
      i += 1;
      while i < chars.len() && chars[i].1.is_ascii_digit() {
        i += 1;
      }
      let end = byte_at(i);
      let text = &input[loc..end];
      let value = text
        .parse::<i64>()
        .map_err(|_| CompileError::lex(input, loc, format!("invalid numeric literal: {text}")))?;
      tokens.push(Token::new(TokenKind::Num, loc, end - loc, Some(value)));
      continue;
    }

    if c.is_ascii_alphabetic() {
      i += 1;
      while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '_') {
        i += 1;
      }
      let end = byte_at(i);
      let kind = keyword_kind(&input[loc..end]).unwrap_or(TokenKind::Ident);
      tokens.push(Token::new(kind, loc, end - loc, None));
      continue;
    }

    if let Some(op) = TWO_CHAR_PUNCTUATORS
      .into_iter()
      .find(|op| input[loc..].starts_with(op))
    {
      tokens.push(Token::new(TokenKind::Punctuator, loc, op.len(), None));
      i += 2;
      continue;
    }

    if is_single_punctuator(c) {
      tokens.push(Token::new(TokenKind::Punctuator, loc, 1, None));
      i += 1;
      continue;
    }

    return Err(CompileError::lex(
      input,
      loc,
      format!("unexpected character: '{c}'"),
    ));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  tracing::trace!(count = tokens.len(), "tokenized input");
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => format!("\"{}\"", token_text(t, source)),
    },
    None => "EOF".to_string(),
  }
}
