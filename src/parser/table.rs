use indexmap::IndexMap;
use crate::bnf::*;
use super::bitset::BitSet;
use super::conflict::{self, Candidates, CodeConflict, Conflict, ConflictKind, ConflictReport, Resolution};
use super::state::{State, StateId, States};

/// What the parser does in a state on a lookahead terminal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
  Shift(StateId),
  Reduce(ProdId),
  /// Shift/reduce decided while parsing by operator precedence.
  Operator {
    shift: StateId,
    reduce: ProdId,
  },
  Accept,
  /// Continue in another state without consuming input.
  Jump(StateId),
  /// Index of a conflict left to a `ConflictResolver`.
  Code(u32),
}

/// Finalized actions and gotos of one state.
#[derive(Clone, Debug, Default)]
pub(crate) struct StateTable {
  pub(crate) actions: IndexMap<TermId, Action>,
  /// taken when `actions` has no entry for the lookahead
  pub(crate) default: Option<Action>,
  pub(crate) gotos: IndexMap<NontermId, StateId>,
}

impl StateTable {
  pub(crate) fn action(&self, term: TermId) -> Option<Action> {
    self.actions.get(&term).copied().or(self.default)
  }
}

pub(super) struct Tables {
  pub(super) rows: Vec<StateTable>,
  pub(super) conflicts: Vec<Conflict>,
  pub(super) reports: Vec<ConflictReport>,
  pub(super) code_conflicts: Vec<CodeConflict>,
}

/// Builds the action table of every state. States in `analysed` have
/// lookaheads on their reduce items; any other state holding a single
/// reduce item reduces by default.
pub(super) fn gen_tables(
  bnf: &Bnf,
  states: &States,
  analysed: &BitSet,
) -> Tables {
  let mut tables = Tables {
    rows: Vec::with_capacity(states.states.len()),
    conflicts: vec![],
    reports: vec![],
    code_conflicts: vec![],
  };

  for state in &states.states {
    let mut row = StateTable::default();
    let mut cands: IndexMap<TermId, Candidates> = IndexMap::new();

    for (&sym, &target) in &state.transitions {
      match sym {
        Symbol::Term(term) => {
          cands.entry(term).or_default().shift = Some(Action::Shift(target));
        }
        Symbol::Nonterm(nonterm) => {
          row.gotos.insert(nonterm, target);
        }
      }
    }
    if state.accepts {
      cands.entry(bnf.eof).or_default().shift = Some(Action::Accept);
    }

    if analysed.get(state.id.index()) {
      for item in &state.items {
        match bnf.next_symbol(item.core) {
          Some(Symbol::Term(term)) => {
            if let Some(cand) = cands.get_mut(&term) {
              cand.shift_items.push(item.core);
            }
          }
          Some(Symbol::Nonterm(_)) => {}
          None => {
            let prod = bnf.item(item.core).prod;
            for term in item.lookaheads.iter() {
              cands.entry(term).or_default().reduces.push((prod, item.core));
            }
          }
        }
      }
    } else {
      let mut reduces = state.reduce_items(bnf);
      if let (Some(item), None) = (reduces.next(), reduces.next()) {
        row.default = Some(Action::Reduce(bnf.item(item.core).prod));
      }
    }

    cands.sort_keys();
    let mut unresolved: IndexMap<ConflictKind, (Vec<TermId>, Vec<ItemId>)> = IndexMap::new();
    for (term, cand) in cands {
      let action = if cand.is_conflict() {
        let (mut action, resolution) = conflict::resolve(bnf, term, &cand);
        if resolution == Resolution::Code {
          let id = tables.code_conflicts.len() as u32;
          tables.code_conflicts.push(CodeConflict {
            state: state.id,
            term,
            shift: match cand.shift {
              Some(Action::Shift(target)) => Some(target),
              _ => None,
            },
            reduces: cand.reduces.iter().map(|&(prod, _)| prod).collect(),
            default: action,
          });
          action = Action::Code(id);
        }
        for kind in cand.kinds() {
          if resolution == Resolution::Default {
            let (terms, items) = unresolved.entry(kind).or_default();
            terms.push(term);
            if kind == ConflictKind::ShiftReduce {
              items.extend(cand.shift_items.iter().copied());
            }
            items.extend(cand.reduces.iter().map(|&(_, item)| item));
          }
          tables.conflicts.push(Conflict {
            state: state.id,
            term,
            kind,
            resolution,
            action,
          });
        }
        action
      } else {
        match cand.action() {
          Some(action) => action,
          None => continue,
        }
      };
      row.actions.insert(term, action);
    }

    for (kind, (terms, mut items)) in unresolved {
      items.sort();
      items.dedup();
      let report = ConflictReport {
        state: state.id,
        kind,
        lookaheads: terms.iter().map(|&t| bnf.token(t).name.clone()).collect(),
        items: items.iter().map(|&item| bnf.item_string(item)).collect(),
      };
      log::warn!("{}", report);
      tables.reports.push(report);
    }

    tables.rows.push(row);
  }

  log::debug!(
    "{} conflicts, {} unresolved, {} left to code",
    tables.conflicts.len(), tables.reports.len(), tables.code_conflicts.len());
  tables
}

/// Terminals with an explicit action in `state`, `error` excluded.
pub(super) fn expected_terms(
  bnf: &Bnf,
  row: &StateTable,
) -> Vec<String> {
  let mut terms = row.actions.keys()
    .copied()
    .filter(|&t| t != bnf.error)
    .collect::<Vec<_>>();
  terms.sort();
  terms.iter().map(|&t| bnf.token(t).name.clone()).collect()
}

/// Whether the reduce items of `state` get lookaheads computed.
pub(super) fn needs_lookaheads(
  bnf: &Bnf,
  state: &State,
  with_pure_reduce: bool,
) -> bool {
  state.inadequate
    || (with_pure_reduce && state.is_pure_reduce() && state.reduce_items(bnf).next().is_some())
}
