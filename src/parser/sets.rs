use crate::bnf::*;
use super::bitset::BitSet;
use super::token_set::{self, TokenSet};

/// Nullability and first sets of a grammar.
pub(crate) struct Sets {
  /// per non-terminal
  pub(crate) nullable: Vec<bool>,
  /// per LR(0) item: every symbol from the dot to the end is nullable
  pub(crate) tail_nullable: BitSet,
  /// per LR(0) item: first set of the symbols from the dot to the end
  pub(crate) tail_first: Vec<TokenSet>,
}

impl Sets {
  pub(crate) fn new(bnf: &Bnf) -> Sets {
    let nullable = gen_nullable(bnf);
    let first = gen_first(bnf, &nullable);
    let (tail_nullable, tail_first) = gen_tails(bnf, &nullable, &first);
    Sets {
      nullable,
      tail_nullable,
      tail_first,
    }
  }
}

pub(super) fn gen_nullable(
  bnf: &Bnf,
) -> Vec<bool> {
  let mut nullable = vec![false; bnf.nonterms.len()];

  loop {
    let mut changed = false;
    for prod in &bnf.prods {
      let nt_ix = prod.nonterm.index();
      if !nullable[nt_ix]
        && prod.symbols.iter().all(|sym| is_nullable(&nullable, sym)) {
        nullable[nt_ix] = true;
        changed = true;
      }
    }
    if !changed {
      break;
    }
  }

  nullable
}

fn is_nullable(nullable: &[bool], sym: &Symbol) -> bool {
  match sym {
    Symbol::Term(_) => false,
    Symbol::Nonterm(id) => nullable[id.index()],
  }
}

pub(super) fn gen_first(
  bnf: &Bnf,
  nullable: &[bool],
) -> Vec<TokenSet> {
  let mut first = vec![TokenSet::new(bnf.tokens.len()); bnf.nonterms.len()];
  let mut deps = vec![vec![]; bnf.nonterms.len()];

  // direct firsts: leading terminals, looking past nullable non-terminals
  for prod in &bnf.prods {
    let nt_ix = prod.nonterm.index();
    for sym in &prod.symbols {
      match sym {
        Symbol::Term(id) => {
          first[nt_ix].insert(*id);
          break;
        }
        Symbol::Nonterm(id) => {
          if !deps[nt_ix].contains(&id.index()) {
            deps[nt_ix].push(id.index());
          }
          if !nullable[id.index()] {
            break;
          }
        }
      }
    }
  }

  let passes = propagate(&mut first, &deps);
  log::trace!("first sets settled after {} passes", passes);
  first
}

fn gen_tails(
  bnf: &Bnf,
  nullable: &[bool],
  first: &[TokenSet],
) -> (BitSet, Vec<TokenSet>) {
  let mut tail_nullable = BitSet::new(bnf.items.len());
  let mut tail_first = vec![TokenSet::new(bnf.tokens.len()); bnf.items.len()];

  for prod in &bnf.prods {
    let start = prod.first_item.index();
    let end = start + prod.symbols.len();
    tail_nullable.insert(end);
    for (dot, sym) in prod.symbols.iter().enumerate().rev() {
      let item = start + dot;
      match sym {
        Symbol::Term(id) => {
          tail_first[item].insert(*id);
        }
        Symbol::Nonterm(id) => {
          tail_first[item].union_with(&first[id.index()]);
          if nullable[id.index()] {
            token_set::union_at(&mut tail_first, item, item + 1);
            if tail_nullable.get(item + 1) {
              tail_nullable.insert(item);
            }
          }
        }
      }
    }
  }

  (tail_nullable, tail_first)
}

/// Makes `sets[i]` a superset of `sets[j]` for every `j` in `deps[i]`,
/// transitively. Each node remembers when it last changed and when its
/// dependencies were last checked, so a pass only re-unions dependencies
/// that changed since the previous check. Returns the number of passes.
pub(super) fn propagate(
  sets: &mut [TokenSet],
  deps: &[Vec<usize>],
) -> usize {
  let n = sets.len();
  let mut clock = 1u32;
  let mut last_changed = vec![1u32; n];
  let mut last_checked = vec![0u32; n];
  let mut passes = 0;

  loop {
    passes += 1;
    let mut changed = false;
    for node in 0..n {
      let checked = last_checked[node];
      last_checked[node] = clock;
      for &dep in &deps[node] {
        if last_changed[dep] > checked && token_set::union_at(sets, node, dep) {
          clock += 1;
          last_changed[node] = clock;
          changed = true;
        }
      }
    }
    if !changed {
      break;
    }
  }

  passes
}
