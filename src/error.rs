//! Source locations, construction errors and parse diagnostics.

use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// A 1-based line/column position in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
  pub line: usize,
  pub column: usize,
}

impl Position {
  pub const fn new(line: usize, column: usize) -> Self {
    Self { line, column }
  }
}

impl Display for Position {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// A half-open source range: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
  pub start: Position,
  pub end: Position,
}

impl Span {
  pub const fn new(start: Position, end: Position) -> Self {
    Self { start, end }
  }

  /// An empty span located at `pos`.
  pub const fn at(pos: Position) -> Self {
    Self { start: pos, end: pos }
  }

  /// Merge two spans into one that covers both.
  pub fn merge(&self, other: &Span) -> Span {
    Span {
      start: self.start.min(other.start),
      end: self.end.max(other.end),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.start == self.end
  }
}

/// Fatal problems found while turning a grammar into parser tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
  #[error("grammar root is not set")]
  UnsetRoot,
  #[error("grammar root `{0}` has no rule")]
  UndefinedRoot(String),
  #[error("symbol `{name}` used in rule `{rule}` is neither a token nor a rule")]
  UndefinedSymbol { name: String, rule: String },
  #[error("token `{0}` is declared more than once")]
  DuplicateToken(String),
  #[error("rule `{0}` is defined more than once")]
  DuplicateRule(String),
  #[error("`{0}` is a reserved name")]
  ReservedName(String),
  #[error("rule `{rule}` contains an empty sequence or alternative")]
  EmptyAlternative { rule: String },
  #[error("`{name}` marked as {context} is not a known term")]
  UnknownTerm { name: String, context: &'static str },
  #[error("internal error in automaton construction: {0}")]
  Internal(String),
}

/// Non-empty list of construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct GrammarErrors(pub Vec<GrammarError>);

impl GrammarErrors {
  pub fn iter(&self) -> impl Iterator<Item = &GrammarError> {
    self.0.iter()
  }
}

impl From<GrammarError> for GrammarErrors {
  fn from(err: GrammarError) -> Self {
    GrammarErrors(vec![err])
  }
}

impl Display for GrammarErrors {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    for (i, err) in self.0.iter().enumerate() {
      if i > 0 {
        writeln!(f)?;
      }
      write!(f, "{}", err)?;
    }
    Ok(())
  }
}

/// A malformed token reported by the external scanner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {}", span.start)]
pub struct ScanError {
  pub message: String,
  pub span: Span,
}

impl ScanError {
  pub fn new(message: impl Into<String>, span: Span) -> Self {
    Self {
      message: message.into(),
      span,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
  Info,
  Warning,
  Error,
}

/// A diagnostic attached to a parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
  pub severity: Severity,
  pub location: Position,
  pub text: String,
}

impl Message {
  pub fn error(location: Position, text: impl Into<String>) -> Self {
    Self {
      severity: Severity::Error,
      location,
      text: text.into(),
    }
  }
}

impl Display for Message {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    let severity = match self.severity {
      Severity::Info => "info",
      Severity::Warning => "warning",
      Severity::Error => "error",
    };
    write!(f, "{}: {}: {}", self.location, severity, self.text)
  }
}
