use once_cell::sync::OnceCell;
use crate::bnf::*;
use crate::error::GrammarErrors;
use crate::grammar::{Grammar, TermFlags};
use self::bitset::BitSet;
use self::sets::Sets;

mod bitset;
mod conflict;
mod lookahead;
mod nlalr;
mod sets;
mod state;
mod table;
mod token_set;

pub use conflict::{CodeConflict, Conflict, ConflictKind, ConflictReport, Resolution};
pub use state::StateId;
pub use table::Action;
pub(crate) use table::StateTable;

/// Automaton flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
  #[default]
  Lalr,
  /// LALR plus folding of compatible states through `Jump` actions.
  Nlalr,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
  pub mode: Mode,
}

impl BuildOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn mode(mut self, mode: Mode) -> Self {
    self.mode = mode;
    self
  }
}

/// Parser tables compiled from a grammar. Immutable once built; one
/// `Parser` can serve any number of concurrent parses.
pub struct Parser {
  pub(crate) bnf: Bnf,
  pub(crate) tables: Vec<StateTable>,
  initial: StateId,
  final_state: StateId,
  conflicts: Vec<Conflict>,
  reports: Vec<ConflictReport>,
  code_conflicts: Vec<CodeConflict>,
  /// per state, filled on first use
  expected: Vec<OnceCell<Vec<String>>>,
  mode: Mode,
  merged: usize,
}

impl Parser {
  pub fn new(
    grammar: Grammar,
    options: BuildOptions,
  ) -> Result<Self, GrammarErrors> {
    grammar.validate()?;
    let mut bnf = Bnf::new(&grammar)?;
    let sets = Sets::new(&bnf);
    for (nonterm, &nullable) in bnf.nonterms.iter_mut().zip(&sets.nullable) {
      if nullable {
        nonterm.flags |= TermFlags::NULLABLE;
      }
    }

    let mut states = state::gen_states(&bnf);
    let nlalr = options.mode == Mode::Nlalr;
    let targets = states.states.iter()
      .filter(|s| table::needs_lookaheads(&bnf, s, nlalr))
      .map(|s| s.id)
      .collect::<Vec<_>>();
    let mut analysed = BitSet::new(states.states.len());
    for id in &targets {
      analysed.insert(id.index());
    }
    let transitions = lookahead::gen_lookaheads(&bnf, &sets, &mut states, &targets)?;

    let table::Tables { mut rows, conflicts, reports, code_conflicts } =
      table::gen_tables(&bnf, &states, &analysed);
    let merged = if nlalr {
      nlalr::merge_states(&bnf, &mut rows)
    } else {
      0
    };

    log::debug!(
      "parser for `{}`: {} states, {} with lookaheads over {} transitions, {} conflicts",
      grammar.root(), rows.len(), targets.len(), transitions, conflicts.len());
    Ok(Parser {
      expected: (0..rows.len()).map(|_| OnceCell::new()).collect(),
      bnf,
      tables: rows,
      initial: states.initial,
      final_state: states.final_state,
      conflicts,
      reports,
      code_conflicts,
      mode: options.mode,
      merged,
    })
  }

  pub fn terminal(&self, name: &str) -> Option<TermId> {
    self.bnf.token_id(name)
  }

  pub fn nonterminal(&self, name: &str) -> Option<NontermId> {
    self.bnf.nonterm_id(name)
  }

  pub fn symbol_name(&self, sym: Symbol) -> &str {
    self.bnf.symbol_name(sym)
  }

  pub fn symbol_flags(&self, sym: Symbol) -> TermFlags {
    self.bnf.symbol_flags(sym)
  }

  /// `A → x y`, or `A → ε` for an empty production.
  pub fn production_string(&self, prod: ProdId) -> String {
    self.bnf.prod_string(prod)
  }

  pub fn eof(&self) -> TermId {
    self.bnf.eof
  }

  pub fn state_count(&self) -> usize {
    self.tables.len()
  }

  pub fn initial_state(&self) -> StateId {
    self.initial
  }

  /// The state that accepts on `$end`.
  pub fn final_state(&self) -> StateId {
    self.final_state
  }

  /// The action on `term`, falling back to the state's default action.
  pub fn action(&self, state: StateId, term: TermId) -> Option<Action> {
    self.tables.get(state.index())?.action(term)
  }

  pub fn goto(&self, state: StateId, nonterm: NontermId) -> Option<StateId> {
    self.tables.get(state.index())?.gotos.get(&nonterm).copied()
  }

  /// Names of the terminals `state` can handle, for syntax error messages.
  /// Folded states answer for their representative.
  pub fn expected_terms(&self, state: StateId) -> &[String] {
    let state = self.representative(state);
    self.expected[state.index()]
      .get_or_init(|| table::expected_terms(&self.bnf, &self.tables[state.index()]))
  }

  pub fn conflicts(&self) -> &[Conflict] {
    &self.conflicts
  }

  /// Conflicts that were settled by the default rule, grouped by state.
  pub fn conflict_reports(&self) -> &[ConflictReport] {
    &self.reports
  }

  pub fn code_conflict(&self, id: u32) -> Option<&CodeConflict> {
    self.code_conflicts.get(id as usize)
  }

  pub fn mode(&self) -> Mode {
    self.mode
  }

  /// Number of states folded away in NLALR mode.
  pub fn merged_states(&self) -> usize {
    self.merged
  }

  pub(crate) fn representative(&self, state: StateId) -> StateId {
    match self.tables[state.index()].default {
      Some(Action::Jump(rep)) => rep,
      _ => state,
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::error::GrammarError;
  use crate::grammar::*;
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn parser_is_shareable() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Parser>();
  }

  #[test]
  fn reports_grammar_errors() {
    let g = grammar(&["a"], "S", [
      ("S", seq([sym("a"), sym("B")])),
      ("T", sym("a") | seq(Vec::new())),
    ]).build().unwrap();
    let errs = Parser::new(g, BuildOptions::default()).err().unwrap();
    assert_eq!(errs.0, vec![GrammarError::EmptyAlternative { rule: "T".to_owned() }]);

    let g = grammar(&["a"], "S", [("S", seq([sym("a"), sym("B")]))]).build().unwrap();
    let errs = Parser::new(g, BuildOptions::default()).err().unwrap();
    assert!(matches!(errs.0[0], GrammarError::UndefinedSymbol { .. }));
  }

  #[test]
  fn introspection() {
    let parser = Parser::new(
      grammar(&["x", ","], "L", [("L", sep_by(sym(","), sym("x")))]).build().unwrap(),
      BuildOptions::default(),
    ).unwrap();
    assert_eq!(parser.mode(), Mode::Lalr);
    let l = parser.nonterminal("L").unwrap();
    let flags = parser.symbol_flags(Symbol::Nonterm(l));
    assert!(flags.contains(TermFlags::NULLABLE | TermFlags::LIST));
    assert!(!parser.symbol_flags(Symbol::Nonterm(parser.nonterminal("x+/,").unwrap()))
      .contains(TermFlags::NULLABLE));

    let initial = parser.initial_state();
    let target = parser.goto(initial, l).unwrap();
    assert_eq!(target, parser.final_state());
    assert_eq!(parser.action(target, parser.eof()), Some(Action::Accept));
    assert_eq!(parser.expected_terms(initial), &["x", "$end"]);
    assert_eq!(parser.terminal("y"), None);
  }
}
