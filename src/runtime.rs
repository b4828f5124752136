//! Table-driven shift-reduce execution over a token stream.

use crate::bnf::*;
use crate::error::{Message, Position, ScanError, Span};
use crate::grammar::{reduce_first, TermFlags};
use crate::parser::{Action, CodeConflict, Parser, StateId};

mod tree;

pub use tree::{ParseTreeNode, TreeDisplay};

/// Decoded value of a token, filled in by the scanner.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TokenValue {
  #[default]
  None,
  Int(i64),
  Float(f64),
  Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub term: TermId,
  pub text: String,
  pub span: Span,
  pub value: TokenValue,
}

impl Token {
  pub fn new(term: TermId, text: impl Into<String>, span: Span) -> Self {
    Self {
      term,
      text: text.into(),
      span,
      value: TokenValue::None,
    }
  }

  pub fn with_value(mut self, value: TokenValue) -> Self {
    self.value = value;
    self
  }
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
  /// Syntax and scan errors tolerated before the parse gives up.
  pub max_errors: usize,
}

impl Default for ParseOptions {
  fn default() -> Self {
    Self {
      max_errors: 20,
    }
  }
}

impl ParseOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn max_errors(mut self, max_errors: usize) -> Self {
    self.max_errors = max_errors;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
  Parsing,
  /// An error token was shifted; input is being skipped until a reduction.
  Recovering,
  Accepted,
  Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
  pub tokens: usize,
  pub shifts: usize,
  pub reductions: usize,
  pub operator_decisions: usize,
  pub jumps: usize,
  pub recoveries: usize,
}

/// Outcome of one parse. `root` is `None` when the input could not be
/// recovered; `messages` then explains why.
#[derive(Debug, Clone)]
pub struct ParseTree {
  pub root: Option<ParseTreeNode>,
  pub messages: Vec<Message>,
  pub status: ParseStatus,
  pub stats: ParserStats,
}

/// Answer of a `ConflictResolver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Shift,
  Reduce(ProdId),
  /// Keep the action the table would have held.
  Default,
}

/// Decides conflicts marked with `resolve_in_code` while parsing.
pub trait ConflictResolver {
  fn resolve(
    &self,
    conflict: &CodeConflict,
    lookahead: &Token,
    stack: &[ParseTreeNode],
  ) -> Decision;
}

impl Parser {
  pub fn parse(
    &self,
    tokens: impl IntoIterator<Item = Token>,
    options: &ParseOptions,
  ) -> ParseTree {
    self.parse_scanned(tokens.into_iter().map(Ok), options)
  }

  /// Parses a scanner's output; scan errors become messages and start
  /// error recovery.
  pub fn parse_scanned(
    &self,
    tokens: impl IntoIterator<Item = Result<Token, ScanError>>,
    options: &ParseOptions,
  ) -> ParseTree {
    Automaton::new(self, options, None, tokens.into_iter()).run()
  }

  pub fn parse_with_resolver(
    &self,
    tokens: impl IntoIterator<Item = Result<Token, ScanError>>,
    options: &ParseOptions,
    resolver: &dyn ConflictResolver,
  ) -> ParseTree {
    Automaton::new(self, options, Some(resolver), tokens.into_iter()).run()
  }
}

/// State of a single parse: the stacks, the input cursor and diagnostics.
struct Automaton<'a, I> {
  parser: &'a Parser,
  options: &'a ParseOptions,
  resolver: Option<&'a dyn ConflictResolver>,
  input: I,
  /// `states[0]` is the initial state; `nodes[i]` was pushed with `states[i + 1]`
  states: Vec<StateId>,
  nodes: Vec<ParseTreeNode>,
  status: ParseStatus,
  messages: Vec<Message>,
  stats: ParserStats,
  errors: usize,
  /// end of the last token read, where `$end` is placed
  last_pos: Position,
  at_eof: bool,
  /// token count at the last recovery
  recovered_at: Option<usize>,
}

impl<'a, I> Automaton<'a, I>
where
  I: Iterator<Item = Result<Token, ScanError>>,
{
  fn new(
    parser: &'a Parser,
    options: &'a ParseOptions,
    resolver: Option<&'a dyn ConflictResolver>,
    input: I,
  ) -> Self {
    Self {
      parser,
      options,
      resolver,
      input,
      states: vec![parser.initial_state()],
      nodes: vec![],
      status: ParseStatus::Parsing,
      messages: vec![],
      stats: ParserStats::default(),
      errors: 0,
      last_pos: Position::new(1, 1),
      at_eof: false,
      recovered_at: None,
    }
  }

  fn run(mut self) -> ParseTree {
    let root = self.drive();
    self.status = if root.is_some() {
      ParseStatus::Accepted
    } else {
      ParseStatus::Error
    };
    log::debug!("parse finished: {:?}, {:?}", self.status, self.stats);
    ParseTree {
      root,
      messages: self.messages,
      status: self.status,
      stats: self.stats,
    }
  }

  fn drive(&mut self) -> Option<ParseTreeNode> {
    let mut lookahead = self.next_token()?;
    loop {
      if log::log_enabled!(log::Level::Trace) {
        self.dump_state(&lookahead);
      }
      let state = self.top();
      let action = match self.parser.tables[state.index()].action(lookahead.term) {
        Some(action) => self.decide(action, &lookahead),
        None => None,
      };
      match action {
        Some(Action::Shift(target)) => {
          log::trace!("Shift {:?}", target);
          self.nodes.push(ParseTreeNode::leaf(lookahead));
          self.states.push(target);
          self.stats.shifts += 1;
          lookahead = self.next_token()?;
        }
        Some(Action::Reduce(prod)) => {
          log::trace!("Reduce {}", self.parser.production_string(prod));
          if self.reduce(prod, &lookahead) {
            if self.status == ParseStatus::Recovering {
              log::trace!("recovered");
              self.status = ParseStatus::Parsing;
            }
          } else {
            lookahead = self.syntax_error(lookahead)?;
          }
        }
        Some(Action::Jump(target)) => {
          log::trace!("Jump {:?}", target);
          if let Some(top) = self.states.last_mut() {
            *top = target;
          }
          self.stats.jumps += 1;
        }
        Some(Action::Accept) => {
          log::trace!("Accept");
          return self.nodes.pop();
        }
        Some(Action::Operator { .. }) | Some(Action::Code(_)) | None => {
          lookahead = self.syntax_error(lookahead)?;
        }
      }
    }
  }

  fn top(&self) -> StateId {
    self.states.last().copied().unwrap_or_else(|| self.parser.initial_state())
  }

  /// Turns `Operator` and `Code` actions into a shift or a reduction.
  fn decide(&mut self, action: Action, lookahead: &Token) -> Option<Action> {
    match action {
      Action::Operator { shift, reduce } => {
        self.stats.operator_decisions += 1;
        let bnf = &self.parser.bnf;
        let current = bnf.token(lookahead.term);
        let previous = self.nodes.iter().rev().find_map(|node| match node.symbol {
          Symbol::Term(t) if bnf.token(t).flags.contains(TermFlags::OPERATOR) => {
            Some(bnf.token(t).prec.unwrap_or(0))
          }
          _ => None,
        });
        let decided = match previous {
          Some(prec) if reduce_first(prec, current.prec.unwrap_or(0), current.assoc) => {
            Action::Reduce(reduce)
          }
          _ => Action::Shift(shift),
        };
        log::trace!("Operator {:?} -> {:?}", lookahead.text, decided);
        Some(decided)
      }
      Action::Code(id) => {
        let conflict = self.parser.code_conflict(id)?;
        let decision = self.resolver
          .map_or(Decision::Default, |r| r.resolve(conflict, lookahead, &self.nodes));
        let decided = match (decision, conflict.shift) {
          (Decision::Shift, Some(target)) => Action::Shift(target),
          (Decision::Reduce(prod), _) if conflict.reduces.contains(&prod) => Action::Reduce(prod),
          _ => conflict.default,
        };
        log::trace!("Code {} -> {:?}", id, decided);
        Some(decided)
      }
      action => Some(action),
    }
  }

  /// Pops the right-hand side of `prod`, builds its node and takes the goto
  /// of the exposed state. Returns false, leaving the stacks untouched, when
  /// the reduction is not possible from the current stack.
  fn reduce(&mut self, prod_id: ProdId, lookahead: &Token) -> bool {
    let prod = self.parser.bnf.prod(prod_id);
    let len = prod.symbols.len();
    let Some(keep) = self.nodes.len().checked_sub(len) else {
      return false;
    };
    let exposed = self.states[keep];
    let Some(target) = self.parser.goto(exposed, prod.nonterm) else {
      return false;
    };

    let children = self.nodes.split_off(keep);
    self.states.truncate(keep + 1);
    let node = self.build_node(prod_id, children, lookahead);
    self.nodes.push(node);
    self.states.push(target);
    self.stats.reductions += 1;
    true
  }

  fn build_node(
    &self,
    prod_id: ProdId,
    mut children: Vec<ParseTreeNode>,
    lookahead: &Token,
  ) -> ParseTreeNode {
    let bnf = &self.parser.bnf;
    let prod = bnf.prod(prod_id);
    let symbol = Symbol::Nonterm(prod.nonterm);
    let span = children.iter()
      .map(|c| c.span)
      .reduce(|a, b| a.merge(&b))
      .unwrap_or_else(|| Span::at(lookahead.span.start));

    match prod.kind {
      ProdKind::ListAppend if !children.is_empty() => {
        // separator and item follow the list node
        let rest = children.split_off(1);
        let mut list = children.remove(0);
        list.children.extend(self.filter(rest));
        list.span = span;
        list
      }
      ProdKind::ListWrap if children.len() == 1 => {
        let mut list = children.remove(0);
        list.symbol = symbol;
        list
      }
      ProdKind::ListStart => ParseTreeNode::new(symbol, self.filter(children), span),
      _ => {
        let mut children = self.filter(children);
        let nonterm = bnf.nonterm(prod.nonterm);
        if nonterm.flags.contains(TermFlags::TRANSIENT) && children.len() == 1 {
          return children.remove(0);
        }
        match nonterm.factory {
          Some(factory) => factory(symbol, children, span),
          None => ParseTreeNode::new(symbol, children, span),
        }
      }
    }
  }

  fn filter(&self, children: Vec<ParseTreeNode>) -> Vec<ParseTreeNode> {
    children.into_iter()
      .filter(|c| !self.parser.symbol_flags(c.symbol).contains(TermFlags::PUNCTUATION))
      .collect()
  }

  /// Next grammar token. Non-grammar tokens are skipped; scan errors are
  /// reported and start recovery. Returns `None` when the parse must stop.
  fn next_token(&mut self) -> Option<Token> {
    let eof = self.parser.eof();
    loop {
      if self.at_eof {
        return Some(Token::new(eof, "", Span::at(self.last_pos)));
      }
      match self.input.next() {
        None => {
          self.at_eof = true;
        }
        Some(Err(err)) => {
          log::trace!("scan error: {}", err);
          self.messages.push(Message::error(err.span.start, err.message));
          self.last_pos = err.span.end;
          if !self.recover(err.span) {
            return None;
          }
        }
        Some(Ok(token)) => {
          if self.parser.symbol_flags(Symbol::Term(token.term)).contains(TermFlags::NON_GRAMMAR) {
            log::trace!("skipping {:?}", token.text);
            continue;
          }
          self.stats.tokens += 1;
          self.last_pos = token.span.end;
          self.at_eof = token.term == eof;
          return Some(token);
        }
      }
    }
  }

  /// Handles a lookahead with no usable action and returns the lookahead
  /// to continue with, or `None` when the parse fails.
  fn syntax_error(&mut self, lookahead: Token) -> Option<Token> {
    let eof = self.parser.eof();
    let looping = self.recovered_at == Some(self.stats.tokens);
    if self.status == ParseStatus::Recovering || looping {
      if lookahead.term == eof {
        return None;
      }
      log::trace!("discarding {:?}", lookahead.text);
      self.status = ParseStatus::Recovering;
      return self.next_token();
    }

    self.report_unexpected(&lookahead);
    if !self.recover(lookahead.span) {
      return None;
    }
    Some(lookahead)
  }

  fn report_unexpected(&mut self, lookahead: &Token) {
    let expected = self.parser.expected_terms(self.top());
    let text = if expected.is_empty() {
      "Syntax error".to_owned()
    } else {
      format!("Syntax error, expected: {}", expected.join(", "))
    };
    self.messages.push(Message::error(lookahead.span.start, text));
  }

  /// Pops to the nearest state that shifts `error` and pushes an error node.
  fn recover(&mut self, at: Span) -> bool {
    self.errors += 1;
    if self.errors > self.options.max_errors {
      self.messages.push(Message::error(at.start, "too many errors"));
      return false;
    }
    let error = self.parser.bnf.error;
    let found = self.states.iter().enumerate().rev().find_map(|(depth, &state)| {
      let rep = self.parser.representative(state);
      match self.parser.tables[rep.index()].actions.get(&error) {
        Some(&Action::Shift(target)) => Some((depth, target)),
        _ => None,
      }
    });
    let Some((depth, target)) = found else {
      log::debug!("no state on the stack shifts `error`");
      return false;
    };
    self.states.truncate(depth + 1);
    self.nodes.truncate(depth);
    self.nodes.push(ParseTreeNode::leaf(Token::new(error, "", Span::at(at.start))));
    self.states.push(target);
    self.status = ParseStatus::Recovering;
    self.stats.recoveries += 1;
    self.recovered_at = Some(self.stats.tokens);
    log::trace!("recovering in {:?}", target);
    true
  }

  fn dump_state(&self, lookahead: &Token) {
    let mut output = String::new();
    for (i, state) in self.states.iter().enumerate() {
      output.push_str(&format!("<{}>", state.0));
      if let Some(node) = self.nodes.get(i) {
        output.push_str(&format!(" {} ", self.parser.symbol_name(node.symbol)));
      }
    }
    log::trace!("{} <- {}", output, self.parser.symbol_name(Symbol::Term(lookahead.term)));
  }
}

#[cfg(test)]
mod tests {
  use crate::error::Position;
  use crate::grammar::*;
  use crate::parser::BuildOptions;
  use crate::test_grammars::*;
  use super::*;
  use pretty_assertions::assert_eq;

  fn render(parser: &Parser, input: &str) -> String {
    let tree = parser.parse(tokenize(parser, input), &ParseOptions::default());
    assert!(tree.messages.is_empty(), "{:?}", tree.messages);
    assert_eq!(tree.status, ParseStatus::Accepted);
    tree.root.unwrap().display(parser).to_string()
  }

  #[test]
  fn left_associative_sum() {
    init_logger();
    let parser = sum_grammar();
    insta::assert_snapshot!(render(&parser, "1 + 2 + 3"), @"(S (S (S 1) + (S 2)) + (S 3))");
  }

  #[test]
  fn precedence() {
    init_logger();
    for runtime in [false, true] {
      let parser = arith(runtime);
      assert_eq!(render(&parser, "1 + 2 * 3"), "(S (S 1) + (S (S 2) * (S 3)))");
      assert_eq!(render(&parser, "1 * 2 + 3"), "(S (S (S 1) * (S 2)) + (S 3))");
      assert_eq!(render(&parser, "1 - 2 - 3"), "(S (S (S 1) - (S 2)) - (S 3))");
    }
  }

  #[test]
  fn runtime_operators_are_counted() {
    let parser = arith(true);
    let tree = parser.parse(tokenize(&parser, "1 + 2 * 3 - 4"), &ParseOptions::default());
    assert!(tree.stats.operator_decisions > 0);
    let plain = arith(false);
    let tree = plain.parse(tokenize(&plain, "1 + 2 * 3 - 4"), &ParseOptions::default());
    assert_eq!(tree.stats.operator_decisions, 0);
  }

  #[test]
  fn leaves_match_input() {
    let parser = arith(false);
    let input = "1 * 2 + 3 * 4 - 5";
    let tree = parser.parse(tokenize(&parser, input), &ParseOptions::default());
    let root = tree.root.unwrap();
    let text = root.tokens().iter().map(|t| t.text.as_str()).collect::<Vec<_>>();
    assert_eq!(text.join(" "), input);
    assert_eq!(root.span.start, Position::new(1, 1));
    assert_eq!(root.span.end, Position::new(1, 18));
    assert_eq!(tree.stats.tokens, 9);
    assert_eq!(tree.stats.shifts, 9);
  }

  #[test]
  fn flat_lists() {
    init_logger();
    let parser = Parser::new(
      grammar(&["a", ","], "L", [("L", sep_by1(sym(","), sym("a")))])
        .punctuation(&[","])
        .build()
        .unwrap(),
      BuildOptions::default(),
    ).unwrap();
    let tree = parser.parse(tokenize(&parser, "a , a , a"), &ParseOptions::default());
    let root = tree.root.unwrap();
    assert_eq!(root.children.len(), 3);
    assert!(root.children.iter().all(|c| c.is_leaf()));
    assert_eq!(root.display(&parser).to_string(), "(L a a a)");

    let parser = Parser::new(
      grammar(&["a", ",", "[", "]"], "S", [
        ("S", seq([sym("["), sep_by(sym(","), sym("a")), sym("]")])),
      ]).punctuation(&["[", "]"]).build().unwrap(),
      BuildOptions::default(),
    ).unwrap();
    assert_eq!(render(&parser, "[ a , a ]"), "(S (a*/, a , a))");
    assert_eq!(render(&parser, "[ ]"), "(S (a*/,))");
  }

  #[test]
  fn list_separators_are_kept() {
    let parser = Parser::new(
      grammar(&["a", "+"], "L", [("L", sep_by1(sym("+"), sym("a")))]).build().unwrap(),
      BuildOptions::default(),
    ).unwrap();
    let input = "a + a + a";
    let tree = parser.parse(tokenize(&parser, input), &ParseOptions::default());
    let root = tree.root.unwrap();
    let text = root.tokens().iter().map(|t| t.text.as_str()).collect::<Vec<_>>();
    assert_eq!(text.join(" "), input);
    assert_eq!(root.children.len(), 5);
    assert_eq!(root.display(&parser).to_string(), "(L a + a + a)");
  }

  #[test]
  fn transient_rules_collapse() {
    let parser = Parser::new(
      grammar(&["num", "+", "(", ")"], "E", [
        ("E", seq([sym("E"), sym("+"), sym("T")]) | sym("T")),
        ("T", sym("P") | sym("num")),
        ("P", seq([sym("("), sym("E"), sym(")")])),
      ])
        .punctuation(&["(", ")"])
        .transient(&["P"])
        .build()
        .unwrap(),
      BuildOptions::default(),
    ).unwrap();
    // no node for `P` or `T`, and no parentheses
    assert_eq!(render(&parser, "( 1 + 2 ) + 3"), "(E (E (E (E 1) + 2)) + 3)");
  }

  #[test]
  fn recovers_with_error_productions() {
    init_logger();
    let parser = statements();
    let tree = parser.parse(tokenize(&parser, "a = 1 ; b = 2 c = 3 ;"), &ParseOptions::default());
    assert_eq!(tree.status, ParseStatus::Accepted);
    assert_eq!(tree.messages, vec![
      Message::error(Position::new(1, 15), "Syntax error, expected: ;"),
    ]);
    assert_eq!(tree.stats.recoveries, 1);
    insta::assert_snapshot!(tree.root.unwrap().display(&parser).to_string(), @"(Prog (Stmt a 1) (Stmt error))");
  }

  #[test]
  fn fails_without_error_productions() {
    let parser = sum_grammar();
    let tree = parser.parse(tokenize(&parser, "1 + + 2"), &ParseOptions::default());
    assert_eq!(tree.status, ParseStatus::Error);
    assert!(tree.root.is_none());
    assert_eq!(tree.messages, vec![
      Message::error(Position::new(1, 5), "Syntax error, expected: num"),
    ]);
  }

  #[test]
  fn reports_missing_input_at_end() {
    let parser = sum_grammar();
    let tree = parser.parse(tokenize(&parser, "1 +"), &ParseOptions::default());
    assert!(tree.root.is_none());
    assert_eq!(tree.messages, vec![
      Message::error(Position::new(1, 4), "Syntax error, expected: num"),
    ]);
  }

  #[test]
  fn stops_after_too_many_errors() {
    let parser = statements();
    let options = ParseOptions::new().max_errors(1);
    let tree = parser.parse(tokenize(&parser, "a = ; b = ; c = 1 ;"), &options);
    assert!(tree.root.is_none());
    let texts = tree.messages.iter().map(|m| m.text.as_str()).collect::<Vec<_>>();
    assert_eq!(texts, vec![
      "Syntax error, expected: num",
      "Syntax error, expected: num",
      "too many errors",
    ]);

    let tree = parser.parse(tokenize(&parser, "a = ; b = ; c = 1 ;"), &ParseOptions::default());
    assert_eq!(tree.status, ParseStatus::Accepted);
    assert_eq!(tree.messages.len(), 2);
  }

  #[test]
  fn scan_errors_start_recovery() {
    let parser = statements();
    let tree = parser.parse_scanned(scan(&parser, "a = ?x ; b = 2 ;"), &ParseOptions::default());
    assert_eq!(tree.status, ParseStatus::Accepted);
    assert_eq!(tree.messages, vec![
      Message::error(Position::new(1, 5), "unexpected character `?`"),
    ]);
    assert_eq!(
      tree.root.unwrap().display(&parser).to_string(),
      "(Prog (Stmt error) (Stmt b 2))");
  }

  #[test]
  fn skips_non_grammar_tokens() {
    let parser = Parser::new(
      grammar(&["num", "+", "comment"], "S", [
        ("S", seq([sym("S"), sym("+"), sym("num")]) | sym("num")),
      ]).non_grammar(&["comment"]).build().unwrap(),
      BuildOptions::default(),
    ).unwrap();
    assert_eq!(render(&parser, "1 + #one 2"), "(S (S 1) + 2)");
  }

  fn drop_plus(symbol: Symbol, mut children: Vec<ParseTreeNode>, span: Span) -> ParseTreeNode {
    children.retain(|c| c.token.as_ref().map_or(true, |t| t.text != "+"));
    ParseTreeNode::new(symbol, children, span)
  }

  #[test]
  fn node_factories() {
    let parser = Parser::new(
      grammar(&["num", "+"], "S", [
        ("S", seq([sym("S"), sym("+"), sym("S")]) | sym("num")),
      ])
        .operators(1, Assoc::Left, &["+"])
        .node_factory("S", drop_plus)
        .build()
        .unwrap(),
      BuildOptions::default(),
    ).unwrap();
    assert_eq!(render(&parser, "1 + 2"), "(S (S 1) (S 2))");
  }

  struct LeftAssoc;

  impl ConflictResolver for LeftAssoc {
    fn resolve(&self, conflict: &CodeConflict, _: &Token, _: &[ParseTreeNode]) -> Decision {
      Decision::Reduce(conflict.reduces[0])
    }
  }

  #[test]
  fn code_resolved_conflicts() {
    let parser = Parser::new(
      grammar(&["num", "+"], "E", [
        ("E", seq([sym("E"), sym("+"), sym("E"), resolve_in_code()]) | sym("num")),
      ]).build().unwrap(),
      BuildOptions::default(),
    ).unwrap();
    let tokens = || tokenize(&parser, "1 + 2 + 3").into_iter().map(Ok);
    let tree = parser.parse_with_resolver(tokens(), &ParseOptions::default(), &LeftAssoc);
    assert_eq!(tree.root.unwrap().display(&parser).to_string(), "(E (E (E 1) + (E 2)) + (E 3))");
    let tree = parser.parse_scanned(tokens(), &ParseOptions::default());
    assert_eq!(tree.root.unwrap().display(&parser).to_string(), "(E (E 1) + (E (E 2) + (E 3)))");
  }

  #[test]
  fn concurrent_parses_share_tables() {
    let parser = arith(true);
    let shared = &parser;
    let inputs = ["1 + 2 * 3", "1 * 2 + 3", "4 - 5 - 6", "7"];
    let results = std::thread::scope(|s| {
      let handles = inputs.iter()
        .map(|&input| s.spawn(move || {
          let tree = shared.parse(tokenize(shared, input), &ParseOptions::default());
          assert!(!shared.expected_terms(shared.initial_state()).is_empty());
          tree.root.map(|root| root.display(shared).to_string())
        }))
        .collect::<Vec<_>>();
      handles.into_iter().map(|h| h.join().unwrap()).collect::<Vec<_>>()
    });
    for (input, result) in inputs.iter().zip(results) {
      assert_eq!(result, Some(render(&parser, input)));
    }
  }
}
