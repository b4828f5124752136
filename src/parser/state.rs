use indexmap::IndexMap;
use indexmap::map::Entry;
use crate::bnf::*;
use super::bitset::BitSet;
use super::lookahead::TransId;
use super::token_set::TokenSet;

/// Parser state id; state 0 is the initial state.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(pub(crate) u32);

impl StateId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// An LR(0) item inside one state, with the sets computed for it there.
pub(crate) struct LrItem {
  pub(crate) core: ItemId,
  /// transitions whose follow sets feed this item
  pub(crate) lookbacks: Vec<TransId>,
  /// only computed for reduce items that need them
  pub(crate) lookaheads: TokenSet,
}

pub(crate) struct State {
  pub(crate) id: StateId,
  pub(crate) kernel: StateKey,
  /// kernel and closure items, sorted by core
  pub(crate) items: Vec<LrItem>,
  /// symbol -> target state
  pub(crate) transitions: IndexMap<Symbol, StateId>,
  /// contains `Root' -> Root • $end`
  pub(crate) accepts: bool,
  /// has several reduce items, or a reduce item next to shifts
  pub(crate) inadequate: bool,
}

/// Sorted LR(0) kernel item ids.
pub(crate) type StateKey = Vec<ItemId>;

pub(crate) struct States {
  pub(crate) states: Vec<State>,
  pub(crate) initial: StateId,
  pub(crate) final_state: StateId,
}

impl State {
  fn new(id: StateId, kernel: StateKey) -> Self {
    State {
      id,
      kernel,
      items: vec![],
      transitions: IndexMap::new(),
      accepts: false,
      inadequate: false,
    }
  }

  pub(crate) fn item_index(&self, core: ItemId) -> Option<usize> {
    self.items.binary_search_by_key(&core, |item| item.core).ok()
  }

  pub(crate) fn reduce_items<'a>(
    &'a self,
    bnf: &'a Bnf,
  ) -> impl Iterator<Item = &'a LrItem> + 'a {
    self.items.iter().filter(move |item| bnf.is_reduce(item.core))
  }

  pub(crate) fn shift_count(&self) -> usize {
    self.transitions.keys()
      .filter(|sym| matches!(sym, Symbol::Term(_)))
      .count()
      + self.accepts as usize
  }

  /// Has no shifts, gotos or accept: only reductions happen here.
  pub(crate) fn is_pure_reduce(&self) -> bool {
    self.transitions.is_empty() && !self.accepts
  }
}

impl States {
  pub(crate) fn state(&self, id: StateId) -> &State {
    &self.states[id.index()]
  }
}

/// Subset construction of the LR(0) automaton, starting from
/// `Root' -> • Root $end`.
pub(super) fn gen_states(
  bnf: &Bnf,
) -> States {
  let mut states: IndexMap<StateKey, State> = IndexMap::new();
  let start_item = bnf.prod(bnf.nonterm(bnf.start).prods[0]).first_item;
  states.insert(vec![start_item], State::new(StateId(0), vec![start_item]));

  // the worklist is the map itself; it grows while being walked
  let mut i = 0;
  while let Some((kernel, _)) = states.get_index(i) {
    let items = closure(bnf, kernel);

    let mut gotos: IndexMap<Symbol, StateKey> = IndexMap::new();
    let mut accepts = false;
    for &item in &items {
      match bnf.next_symbol(item) {
        Some(Symbol::Term(t)) if t == bnf.eof => accepts = true,
        Some(sym) => gotos.entry(sym).or_default().push(item.next()),
        None => {}
      }
    }

    let mut transitions = IndexMap::new();
    for (sym, key) in gotos {
      let next = StateId(states.len() as u32);
      let target = match states.entry(key) {
        Entry::Occupied(e) => e.get().id,
        Entry::Vacant(e) => {
          let key = e.key().clone();
          e.insert(State::new(next, key));
          next
        }
      };
      transitions.insert(sym, target);
    }

    if let Some((_, state)) = states.get_index_mut(i) {
      state.items = items.into_iter()
        .map(|core| LrItem {
          core,
          lookbacks: vec![],
          lookaheads: TokenSet::new(bnf.tokens.len()),
        })
        .collect();
      state.transitions = transitions;
      state.accepts = accepts;
      let reduces = state.reduce_items(bnf).count();
      state.inadequate = reduces > 1 || (reduces == 1 && state.shift_count() > 0);
    }
    i += 1;
  }

  let states = states.into_values().collect::<Vec<_>>();
  let final_state = states.iter()
    .find(|s| s.accepts)
    .map_or(StateId(0), |s| s.id);
  log::debug!(
    "{} states, {} inadequate",
    states.len(),
    states.iter().filter(|s| s.inadequate).count());

  States {
    states,
    initial: StateId(0),
    final_state,
  }
}

/// Kernel items plus the initial items of every non-terminal that can
/// appear after a dot, sorted.
fn closure(
  bnf: &Bnf,
  kernel: &[ItemId],
) -> Vec<ItemId> {
  let mut items = kernel.to_vec();
  let mut added = BitSet::new(bnf.nonterms.len());
  let mut i = 0;
  while i < items.len() {
    if let Some(Symbol::Nonterm(nt)) = bnf.next_symbol(items[i]) {
      if added.insert(nt.index()) {
        for &prod in &bnf.nonterm(nt).prods {
          items.push(bnf.prod(prod).first_item);
        }
      }
    }
    i += 1;
  }
  items.sort();
  items.dedup();
  items
}
