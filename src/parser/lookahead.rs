use crate::bnf::*;
use crate::error::GrammarError;
use super::bitset::BitSet;
use super::sets::{self, Sets};
use super::state::{StateId, States};
use super::token_set::TokenSet;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub(crate) struct TransId(pub(crate) u32);

impl TransId {
  pub(crate) fn index(self) -> usize {
    self.0 as usize
  }
}

/// A goto edge over a non-terminal.
pub(crate) struct Transition {
  pub(crate) from: StateId,
  pub(crate) nonterm: NontermId,
  /// terminals that can follow `nonterm` when it is entered through this edge
  pub(crate) sources: TokenSet,
  /// transitions whose sources are merged into this one
  pub(crate) includes: Vec<TransId>,
}

/// Computes the lookaheads of every reduce item in `targets` and returns
/// the number of transitions that had to be analysed.
///
/// Each goto transition `(p, A)` collects the first sets of whatever
/// follows `A` in the items of `p`; when that tail is nullable, it also
/// includes the transitions feeding those items (their lookbacks). Only the
/// transitions reachable from the target reduce items are analysed.
pub(super) fn gen_lookaheads(
  bnf: &Bnf,
  sets: &Sets,
  states: &mut States,
  targets: &[StateId],
) -> Result<usize, GrammarError> {
  let num_tokens = bnf.tokens.len();
  let mut transitions = vec![];
  for state in &states.states {
    for &sym in state.transitions.keys() {
      if let Symbol::Nonterm(nonterm) = sym {
        transitions.push(Transition {
          from: state.id,
          nonterm,
          sources: TokenSet::new(num_tokens),
          includes: vec![],
        });
      }
    }
  }

  gen_lookbacks(bnf, states, &transitions)?;

  let mut needed = BitSet::new(transitions.len());
  let mut queue = vec![];
  for &id in targets {
    for item in states.state(id).reduce_items(bnf) {
      for &lookback in &item.lookbacks {
        if needed.insert(lookback.index()) {
          queue.push(lookback);
        }
      }
    }
  }

  while let Some(t) = queue.pop() {
    let nonterm = Symbol::Nonterm(transitions[t.index()].nonterm);
    let from = states.state(transitions[t.index()].from);
    let mut sources = TokenSet::new(num_tokens);
    let mut includes = vec![];
    for item in &from.items {
      if bnf.next_symbol(item.core) != Some(nonterm) {
        continue;
      }
      let after = item.core.next().index();
      sources.union_with(&sets.tail_first[after]);
      if sets.tail_nullable.get(after) {
        for &lookback in &item.lookbacks {
          if !includes.contains(&lookback) {
            includes.push(lookback);
          }
          if needed.insert(lookback.index()) {
            queue.push(lookback);
          }
        }
      }
    }
    transitions[t.index()].sources = sources;
    transitions[t.index()].includes = includes;
  }

  let deps = transitions.iter()
    .map(|t| t.includes.iter().map(|i| i.index()).collect())
    .collect::<Vec<Vec<usize>>>();
  let mut follow = transitions.iter()
    .map(|t| t.sources.clone())
    .collect::<Vec<_>>();
  let passes = sets::propagate(&mut follow, &deps);
  let analysed = needed.iter().count();
  log::trace!(
    "{} of {} transitions analysed, includes closed after {} passes",
    analysed, transitions.len(), passes);
  for (transition, follow) in transitions.iter_mut().zip(follow) {
    transition.sources = follow;
  }

  for &id in targets {
    let state = &mut states.states[id.index()];
    for item in state.items.iter_mut().filter(|item| bnf.is_reduce(item.core)) {
      for lookback in &item.lookbacks {
        item.lookaheads.union_with(&transitions[lookback.index()].sources);
      }
      if item.lookaheads.is_empty() {
        let msg = format!(
          "reduce item `{}` in state {} has no lookaheads",
          bnf.item_string(item.core), id.0);
        log::error!("{}", msg);
        return Err(GrammarError::Internal(msg));
      }
    }
  }

  Ok(analysed)
}

/// Walks every production of each transition's non-terminal forward from
/// the transition's source state, recording the transition as a lookback
/// of each item met on the way (the last one being the reduce item).
fn gen_lookbacks(
  bnf: &Bnf,
  states: &mut States,
  transitions: &[Transition],
) -> Result<(), GrammarError> {
  for (t, transition) in transitions.iter().enumerate() {
    for &prod in &bnf.nonterm(transition.nonterm).prods {
      let prod = bnf.prod(prod);
      let mut s = transition.from;
      for dot in 0..=prod.symbols.len() {
        let core = ItemId(prod.first_item.0 + dot as u32);
        let state = &mut states.states[s.index()];
        let ix = state.item_index(core).ok_or_else(|| GrammarError::Internal(format!(
          "item `{}` missing from state {}", bnf.item_string(core), s.0)))?;
        state.items[ix].lookbacks.push(TransId(t as u32));
        if let Some(sym) = prod.symbols.get(dot) {
          s = *state.transitions.get(sym).ok_or_else(|| GrammarError::Internal(format!(
            "state {} has no transition over `{}`", s.0, bnf.symbol_name(*sym))))?;
        }
      }
    }
  }
  Ok(())
}
