//! Sample grammars and a whitespace tokenizer for the tests.

use crate::error::{Position, ScanError, Span};
use crate::grammar::*;
use crate::parser::{BuildOptions, Parser};
use crate::runtime::{Token, TokenValue};

pub(crate) fn init_logger() {
  let _ = env_logger::builder().is_test(true).try_init();
}

/// `S → S + S | num`, `+` left-associative.
pub(crate) fn sum_grammar() -> Parser {
  build(grammar(&["num", "+"], "S", [
    ("S", seq([sym("S"), sym("+"), sym("S")]) | sym("num")),
  ]).operators(1, Assoc::Left, &["+"]))
}

/// Binary `+ - *` over numbers, the operators declared statically or
/// resolved while parsing.
pub(crate) fn arith(runtime: bool) -> Parser {
  let mut builder = grammar(&["num", "+", "-", "*"], "S", [
    ("S", seq([sym("S"), sym("+"), sym("S")])
      | seq([sym("S"), sym("-"), sym("S")])
      | seq([sym("S"), sym("*"), sym("S")])
      | sym("num")),
  ]);
  if runtime {
    builder
      .runtime_operators(1, Assoc::Left, &["+", "-"])
      .runtime_operators(2, Assoc::Left, &["*"]);
  } else {
    builder
      .operators(1, Assoc::Left, &["+", "-"])
      .operators(2, Assoc::Left, &["*"]);
  }
  build(&mut builder)
}

/// `id = num ;` statements with an `error ;` production.
pub(crate) fn statements() -> Parser {
  build(grammar(&["id", "num", "=", ";"], "Prog", [
    ("Prog", many(sym("Stmt"))),
    ("Stmt", seq([sym("id"), sym("="), sym("num"), sym(";")])
      | seq([sym("error"), sym(";")])),
  ]).punctuation(&["=", ";"]))
}

fn build(builder: &mut GrammarBuilder) -> Parser {
  Parser::new(builder.build().unwrap(), BuildOptions::default()).unwrap()
}

/// Splits `input` on whitespace. Declared token names stand for
/// themselves, digits are `num`, words starting with `#` are `comment` and
/// anything else is `id`.
pub(crate) fn tokenize(parser: &Parser, input: &str) -> Vec<Token> {
  scan(parser, input).into_iter().map(|t| t.unwrap()).collect()
}

/// Like `tokenize`, but words starting with `?` are scan errors.
pub(crate) fn scan(parser: &Parser, input: &str) -> Vec<Result<Token, ScanError>> {
  let mut tokens = vec![];
  for (line_ix, line) in input.lines().enumerate() {
    let mut column = 1;
    for word in line.split(' ') {
      if !word.is_empty() {
        let start = Position::new(line_ix + 1, column);
        let end = Position::new(line_ix + 1, column + word.chars().count());
        tokens.push(word_token(parser, word, Span::new(start, end)));
      }
      column += word.chars().count() + 1;
    }
  }
  tokens
}

fn word_token(parser: &Parser, word: &str, span: Span) -> Result<Token, ScanError> {
  if word.starts_with('?') {
    return Err(ScanError::new("unexpected character `?`", span));
  }
  let named = match parser.terminal(word) {
    Some(term) if word != ERROR && word != EOF => Some(term),
    _ => None,
  };
  let (kind, value) = if named.is_some() {
    (word, TokenValue::None)
  } else if let Ok(n) = word.parse::<i64>() {
    ("num", TokenValue::Int(n))
  } else if word.starts_with('#') {
    ("comment", TokenValue::Str(word[1..].to_owned()))
  } else {
    ("id", TokenValue::Str(word.to_owned()))
  };
  let term = parser.terminal(kind)
    .unwrap_or_else(|| panic!("no token `{}` for `{}`", kind, word));
  Ok(Token::new(term, word, span).with_value(value))
}
