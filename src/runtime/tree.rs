use std::fmt::{self, Display, Formatter};
use crate::bnf::Symbol;
use crate::error::Span;
use crate::parser::Parser;
use super::Token;

/// A node of the parse tree. Leaves carry the token they were shifted from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTreeNode {
  pub symbol: Symbol,
  pub token: Option<Token>,
  pub span: Span,
  pub children: Vec<ParseTreeNode>,
}

impl ParseTreeNode {
  pub fn new(symbol: Symbol, children: Vec<ParseTreeNode>, span: Span) -> Self {
    Self {
      symbol,
      token: None,
      span,
      children,
    }
  }

  pub fn leaf(token: Token) -> Self {
    Self {
      symbol: Symbol::Term(token.term),
      span: token.span,
      token: Some(token),
      children: vec![],
    }
  }

  pub fn is_leaf(&self) -> bool {
    self.token.is_some()
  }

  /// Tokens of the leaves below this node, left to right.
  pub fn tokens(&self) -> Vec<&Token> {
    let mut tokens = vec![];
    self.collect_tokens(&mut tokens);
    tokens
  }

  fn collect_tokens<'a>(&'a self, tokens: &mut Vec<&'a Token>) {
    match &self.token {
      Some(token) => tokens.push(token),
      None => {
        for child in &self.children {
          child.collect_tokens(tokens);
        }
      }
    }
  }

  /// S-expression rendering: `(S (S 1) + (S 2))`.
  pub fn display<'a>(&'a self, parser: &'a Parser) -> TreeDisplay<'a> {
    TreeDisplay {
      node: self,
      parser,
    }
  }
}

pub struct TreeDisplay<'a> {
  node: &'a ParseTreeNode,
  parser: &'a Parser,
}

impl<'a> Display for TreeDisplay<'a> {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    let name = self.parser.symbol_name(self.node.symbol);
    if let Some(token) = &self.node.token {
      if token.text.is_empty() {
        return write!(f, "{}", name);
      }
      return write!(f, "{}", token.text);
    }
    write!(f, "({}", name)?;
    for child in &self.node.children {
      write!(f, " {}", child.display(self.parser))?;
    }
    write!(f, ")")
  }
}
