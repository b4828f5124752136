use crate::bnf::*;
use super::table::{Action, StateTable};
use super::state::StateId;

/// Folds states into earlier states with the same shifts and gotos whose
/// reductions never disagree and all pop the same right-hand side. A folded
/// state keeps only a default `Jump` to its representative, which takes
/// over its reductions. Returns the number of folded states.
pub(super) fn merge_states(
  bnf: &Bnf,
  rows: &mut [StateTable],
) -> usize {
  let mut reps: Vec<usize> = vec![];
  let mut merged = 0;
  for i in 0..rows.len() {
    if !mergeable(&rows[i]) {
      continue;
    }
    let (left, right) = rows.split_at_mut(i);
    let found = reps.iter().copied().find(|&r| compatible(bnf, &left[r], &right[0]));
    let row = &mut right[0];
    match found {
      Some(r) => {
        let rep = &mut left[r];
        for (&term, &action) in &row.actions {
          rep.actions.entry(term).or_insert(action);
        }
        rep.actions.sort_keys();
        *row = StateTable {
          default: Some(Action::Jump(StateId(r as u32))),
          ..StateTable::default()
        };
        log::trace!("state {} folded into {}", i, r);
        merged += 1;
      }
      None => reps.push(i),
    }
  }
  log::debug!("{} states folded into {} representatives", merged, reps.len());
  merged
}

/// Only rows made of plain shifts and reductions take part.
fn mergeable(row: &StateTable) -> bool {
  row.default.is_none()
    && row.actions.values().all(|a| matches!(a, Action::Shift(_) | Action::Reduce(_)))
}

fn compatible(bnf: &Bnf, rep: &StateTable, row: &StateTable) -> bool {
  if rep.gotos != row.gotos {
    return false;
  }
  let shifts = |r: &StateTable| r.actions.iter()
    .filter(|(_, a)| matches!(a, Action::Shift(_)))
    .map(|(&t, &a)| (t, a))
    .collect::<Vec<_>>();
  if shifts(rep) != shifts(row) {
    return false;
  }
  match (handle(bnf, rep), handle(bnf, row)) {
    (Some(Some(a)), Some(Some(b))) if a == b => {}
    _ => return false,
  }
  row.actions.iter().all(|(term, action)| {
    rep.actions.get(term).map_or(true, |other| other == action)
  })
}

/// The right-hand side every reduction of `row` pops: `None` without
/// reductions, `Some(None)` when they differ.
fn handle<'a>(bnf: &'a Bnf, row: &StateTable) -> Option<Option<&'a [Symbol]>> {
  let mut handle = None;
  for action in row.actions.values() {
    if let Action::Reduce(prod) = *action {
      let symbols = bnf.prod(prod).symbols.as_slice();
      match handle {
        None => handle = Some(Some(symbols)),
        Some(Some(seen)) if seen != symbols => return Some(None),
        _ => {}
      }
    }
  }
  handle
}
