//! Shared error utilities used across the compilation pipeline.
//!
//! Every diagnostic keeps the full source text and the byte offset it points
//! at. Rendering copies the offending source line under an `Error: ` label and
//! places a caret beneath the recorded position, followed by the message.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

const PREFIX: &str = "Error: ";
const NOT_LVALUE: &str = "not an lvalue";

#[derive(Debug, Snafu)]
pub enum CompileError {
  /// The tokenizer met a character or literal it cannot turn into a token.
  #[snafu(display("{}", render(input, *loc, message)))]
  Lex {
    input: String,
    loc: usize,
    message: String,
  },
  /// The parser expected a different token at `loc`.
  #[snafu(display("{}", render(input, *loc, message)))]
  Syntax {
    input: String,
    loc: usize,
    message: String,
  },
  /// An assignment whose left-hand side does not name a variable.
  #[snafu(display("{}", render(input, *loc, NOT_LVALUE)))]
  NotLvalue { input: String, loc: usize },
}

impl CompileError {
  /// Lexical error anchored at a byte offset in the source.
  pub fn lex(input: &str, loc: usize, message: impl Into<String>) -> Self {
    Self::Lex {
      input: input.to_string(),
      loc,
      message: message.into(),
    }
  }

  /// Syntax error anchored at a byte offset in the source.
  pub fn syntax(input: &str, loc: usize, message: impl Into<String>) -> Self {
    Self::Syntax {
      input: input.to_string(),
      loc,
      message: message.into(),
    }
  }

  pub fn not_lvalue(input: &str, loc: usize) -> Self {
    Self::NotLvalue {
      input: input.to_string(),
      loc,
    }
  }

  /// Byte offset the diagnostic points at.
  pub fn loc(&self) -> usize {
    match self {
      Self::Lex { loc, .. } | Self::Syntax { loc, .. } | Self::NotLvalue { loc, .. } => *loc,
    }
  }

  /// The bare message, without the source excerpt and caret.
  pub fn message(&self) -> &str {
    match self {
      Self::Lex { message, .. } | Self::Syntax { message, .. } => message,
      Self::NotLvalue { .. } => NOT_LVALUE,
    }
  }
}

/// Format the two-line "source + caret" diagnostic.
fn render(input: &str, loc: usize, message: &str) -> String {
  let mut anchor = loc.min(input.len());
  // An end-of-input position after trailing whitespace points at the end of
  // the last visible line instead of an empty one.
  if anchor == input.len() {
    anchor = input.trim_end().len();
  }
  while !input.is_char_boundary(anchor) {
    anchor -= 1;
  }

  let line_start = input[..anchor].rfind('\n').map_or(0, |i| i + 1);
  let line_end = input[anchor..]
    .find('\n')
    .map_or(input.len(), |i| anchor + i);
  let line = input[line_start..line_end].trim_end_matches('\r');
  let column = input[line_start..anchor].chars().count();

  format!(
    "{PREFIX}{line}\n{}^ {message}",
    " ".repeat(column + PREFIX.len())
  )
}
