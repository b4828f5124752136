use std::fmt::{self, Display, Formatter};
use crate::bnf::*;
use crate::grammar::{reduce_first, Hint, TermFlags};
use super::state::StateId;
use super::table::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictKind {
  ShiftReduce,
  ReduceReduce,
}

/// Which rule settled a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolution {
  /// A `prefer_shift`, `prefer_reduce` hint in the grammar.
  Hint,
  Precedence,
  /// Deferred to the parser, which compares the operators on the stack.
  Operator,
  /// Deferred to a `ConflictResolver`.
  Code,
  /// Nothing applied: shift wins, then the earliest production.
  Default,
}

/// A shift/reduce or reduce/reduce conflict on one terminal of one state.
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
  pub state: StateId,
  pub term: TermId,
  pub kind: ConflictKind,
  pub resolution: Resolution,
  /// action placed in the table
  pub action: Action,
}

/// Conflicts of one kind in one state that no rule resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictReport {
  pub state: StateId,
  pub kind: ConflictKind,
  pub lookaheads: Vec<String>,
  /// items taking part, rendered
  pub items: Vec<String>,
}

/// A conflict marked with `resolve_in_code`, identified by `Action::Code`.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeConflict {
  pub state: StateId,
  pub term: TermId,
  pub shift: Option<StateId>,
  pub reduces: Vec<ProdId>,
  /// what the table would hold without the hint
  pub default: Action,
}

impl Display for ConflictKind {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    match self {
      ConflictKind::ShiftReduce => write!(f, "shift/reduce"),
      ConflictKind::ReduceReduce => write!(f, "reduce/reduce"),
    }
  }
}

impl Display for ConflictReport {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "state {}: {} conflict on ", self.state.0, self.kind)?;
    for (i, la) in self.lookaheads.iter().enumerate() {
      if i > 0 {
        write!(f, ", ")?;
      }
      write!(f, "`{}`", la)?;
    }
    for item in &self.items {
      write!(f, "\n  {}", item)?;
    }
    Ok(())
  }
}

/// Everything a state could do on one terminal.
#[derive(Default)]
pub(super) struct Candidates {
  /// `Shift` or `Accept`
  pub(super) shift: Option<Action>,
  /// items with the terminal right after the dot
  pub(super) shift_items: Vec<ItemId>,
  /// reduce items, in production order
  pub(super) reduces: Vec<(ProdId, ItemId)>,
}

impl Candidates {
  pub(super) fn is_conflict(&self) -> bool {
    self.reduces.len() + self.shift.is_some() as usize > 1
  }

  /// A shift against several reductions is both kinds at once.
  pub(super) fn kinds(&self) -> Vec<ConflictKind> {
    let mut kinds = vec![];
    if self.shift.is_some() && !self.reduces.is_empty() {
      kinds.push(ConflictKind::ShiftReduce);
    }
    if self.reduces.len() > 1 {
      kinds.push(ConflictKind::ReduceReduce);
    }
    kinds
  }

  /// The single action when there is no conflict.
  pub(super) fn action(&self) -> Option<Action> {
    self.shift.or_else(|| self.reduces.first().map(|&(prod, _)| Action::Reduce(prod)))
  }
}

/// Picks the action for a conflicting terminal: hints first, then
/// precedence, then the default. For `Resolution::Code` the returned action
/// is the fallback a resolver may choose to keep.
pub(super) fn resolve(
  bnf: &Bnf,
  term: TermId,
  cands: &Candidates,
) -> (Action, Resolution) {
  if let Some(action) = resolve_by_hint(bnf, cands) {
    return (action, Resolution::Hint);
  }
  if cands.shift_items.iter()
    .chain(cands.reduces.iter().map(|(_, item)| item))
    .any(|&item| bnf.hint_at(item) == Some(Hint::ResolveInCode)) {
    return (resolve_by_default(cands), Resolution::Code);
  }
  if let Some(resolved) = resolve_by_prec(bnf, term, cands) {
    return resolved;
  }
  (resolve_by_default(cands), Resolution::Default)
}

fn resolve_by_hint(
  bnf: &Bnf,
  cands: &Candidates,
) -> Option<Action> {
  for &item in &cands.shift_items {
    match bnf.hint_at(item) {
      Some(Hint::PreferShift) => return cands.shift,
      Some(Hint::PreferReduce) => {
        if let Some(&(prod, _)) = cands.reduces.first() {
          return Some(Action::Reduce(prod));
        }
      }
      _ => {}
    }
  }
  cands.reduces.iter()
    .find(|&&(_, item)| bnf.hint_at(item) == Some(Hint::PreferReduce))
    .map(|&(prod, _)| Action::Reduce(prod))
}

/// Only plain shift/reduce conflicts with a single reduction are decided by
/// precedence, and only when both the terminal and the production have one.
fn resolve_by_prec(
  bnf: &Bnf,
  term: TermId,
  cands: &Candidates,
) -> Option<(Action, Resolution)> {
  let shift = match cands.shift {
    Some(Action::Shift(shift)) => shift,
    _ => return None,
  };
  let reduce = match cands.reduces.as_slice() {
    [(prod, _)] => *prod,
    _ => return None,
  };
  let token = bnf.token(term);
  if token.flags.contains(TermFlags::OPERATOR) {
    return Some((Action::Operator { shift, reduce }, Resolution::Operator));
  }
  let term_prec = token.prec?;
  let prod_prec = bnf.prod(reduce).prec?;
  let action = if reduce_first(prod_prec, term_prec, token.assoc) {
    Action::Reduce(reduce)
  } else {
    Action::Shift(shift)
  };
  Some((action, Resolution::Precedence))
}

fn resolve_by_default(
  cands: &Candidates,
) -> Action {
  cands.action().unwrap_or(Action::Accept)
}

#[cfg(test)]
mod tests {
  use crate::grammar::*;
  use crate::parser::{BuildOptions, Parser};
  use super::*;
  use pretty_assertions::assert_eq;

  fn build(builder: &mut GrammarBuilder) -> Parser {
    Parser::new(builder.build().unwrap(), BuildOptions::default()).unwrap()
  }

  fn summary(parser: &Parser) -> Vec<(String, ConflictKind, Resolution, String)> {
    parser.conflicts().iter()
      .map(|c| (
        parser.symbol_name(Symbol::Term(c.term)).to_owned(),
        c.kind,
        c.resolution,
        match c.action {
          Action::Shift(_) => "shift".to_owned(),
          Action::Reduce(prod) => parser.production_string(prod),
          ref other => format!("{:?}", other),
        },
      ))
      .collect()
  }

  fn dangling_else(hint: bool) -> GrammarBuilder {
    let mut then_else = vec![sym("if"), sym("c"), sym("then"), sym("S")];
    if hint {
      then_else.push(prefer_shift());
    }
    then_else.extend([sym("else"), sym("S")]);
    grammar(&["if", "c", "then", "else", "x"], "S", [
      ("S", seq([sym("if"), sym("c"), sym("then"), sym("S")])
        | seq(then_else)
        | sym("x")),
    ])
  }

  #[test]
  fn dangling_else_defaults_to_shift() {
    let parser = build(&mut dangling_else(false));
    assert_eq!(summary(&parser), vec![(
      "else".to_owned(),
      ConflictKind::ShiftReduce,
      Resolution::Default,
      "shift".to_owned(),
    )]);
    let reports = parser.conflict_reports();
    assert_eq!(reports.len(), 1);
    insta::assert_snapshot!(reports[0].to_string(), @r###"
    state 6: shift/reduce conflict on `else`
      S → if c then S •
      S → if c then S • else S
    "###);
  }

  #[test]
  fn dangling_else_with_hint() {
    let parser = build(&mut dangling_else(true));
    assert_eq!(summary(&parser), vec![(
      "else".to_owned(),
      ConflictKind::ShiftReduce,
      Resolution::Hint,
      "shift".to_owned(),
    )]);
    assert!(parser.conflict_reports().is_empty());
  }

  fn reduce_reduce(hint: bool) -> GrammarBuilder {
    let b = if hint { seq([sym("x"), prefer_reduce()]) } else { sym("x") };
    grammar(&["x"], "S", [
      ("S", sym("A") | sym("B")),
      ("A", sym("x")),
      ("B", b),
    ])
  }

  #[test]
  fn reduce_reduce_prefers_first_production() {
    let parser = build(&mut reduce_reduce(false));
    assert_eq!(summary(&parser), vec![(
      "$end".to_owned(),
      ConflictKind::ReduceReduce,
      Resolution::Default,
      "A → x".to_owned(),
    )]);
    assert_eq!(parser.conflict_reports()[0].kind, ConflictKind::ReduceReduce);
  }

  #[test]
  fn reduce_reduce_with_hint() {
    let parser = build(&mut reduce_reduce(true));
    assert_eq!(summary(&parser), vec![(
      "$end".to_owned(),
      ConflictKind::ReduceReduce,
      Resolution::Hint,
      "B → x".to_owned(),
    )]);
    assert!(parser.conflict_reports().is_empty());
  }

  #[test]
  fn shift_against_two_reductions() {
    let parser = build(&mut grammar(&["x", "y"], "S", [
      ("S", seq([sym("A"), sym("y")]) | seq([sym("B"), sym("y")]) | seq([sym("x"), sym("y")])),
      ("A", sym("x")),
      ("B", sym("x")),
    ]));
    assert_eq!(summary(&parser), vec![
      ("y".to_owned(), ConflictKind::ShiftReduce, Resolution::Default, "shift".to_owned()),
      ("y".to_owned(), ConflictKind::ReduceReduce, Resolution::Default, "shift".to_owned()),
    ]);
    let reports = parser.conflict_reports();
    assert_eq!(
      reports.iter().map(|r| r.kind).collect::<Vec<_>>(),
      vec![ConflictKind::ShiftReduce, ConflictKind::ReduceReduce]);
    assert_eq!(reports[1].items, vec!["A → x •".to_owned(), "B → x •".to_owned()]);
  }

  #[test]
  fn hint_outranks_precedence() {
    let parser = build(grammar(&["n", "+"], "E", [
      ("E", seq([sym("E"), prefer_shift(), sym("+"), sym("E")]) | sym("n")),
    ]).operators(1, Assoc::Left, &["+"]));
    assert_eq!(summary(&parser), vec![(
      "+".to_owned(),
      ConflictKind::ShiftReduce,
      Resolution::Hint,
      "shift".to_owned(),
    )]);
  }

  #[test]
  fn precedence_and_associativity() {
    let parser = build(grammar(&["n", "+", "*"], "E", [
      ("E", seq([sym("E"), sym("+"), sym("E")])
        | seq([sym("E"), sym("*"), sym("E")])
        | sym("n")),
    ])
      .operators(1, Assoc::Left, &["+"])
      .operators(2, Assoc::Left, &["*"]));
    let mut result = summary(&parser);
    result.sort();
    assert_eq!(result, vec![
      ("*".to_owned(), ConflictKind::ShiftReduce, Resolution::Precedence, "E → E * E".to_owned()),
      ("*".to_owned(), ConflictKind::ShiftReduce, Resolution::Precedence, "shift".to_owned()),
      ("+".to_owned(), ConflictKind::ShiftReduce, Resolution::Precedence, "E → E * E".to_owned()),
      ("+".to_owned(), ConflictKind::ShiftReduce, Resolution::Precedence, "E → E + E".to_owned()),
    ]);
    assert!(parser.conflict_reports().is_empty());
  }

  #[test]
  fn runtime_operators_defer() {
    let parser = build(grammar(&["n", "+"], "E", [
      ("E", seq([sym("E"), sym("+"), sym("E")]) | sym("n")),
    ]).runtime_operators(1, Assoc::Left, &["+"]));
    let conflicts = parser.conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].resolution, Resolution::Operator);
    assert!(matches!(conflicts[0].action, Action::Operator { .. }));
  }

  #[test]
  fn resolve_in_code_records_fallback() {
    let parser = build(&mut grammar(&["n", "+"], "E", [
      ("E", seq([sym("E"), sym("+"), sym("E"), resolve_in_code()]) | sym("n")),
    ]));
    let conflicts = parser.conflicts();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].resolution, Resolution::Code);
    let code = parser.code_conflict(0).unwrap();
    assert_eq!(code.term, parser.terminal("+").unwrap());
    assert!(code.shift.is_some());
    assert_eq!(code.reduces.len(), 1);
    assert!(matches!(code.default, Action::Shift(_)));
  }
}
