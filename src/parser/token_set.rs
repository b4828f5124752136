use std::fmt::{self, Debug, Formatter};
use crate::bnf::TermId;

type BitBlock = u64;

const BLOCK_NBITS: usize = std::mem::size_of::<BitBlock>() * 8;

/// Set of terminals.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TokenSet {
  slice: Box<[BitBlock]>,
}

impl TokenSet {
  pub fn new(num_tokens: usize) -> Self {
    let len = (num_tokens + BLOCK_NBITS - 1) / BLOCK_NBITS;
    Self {
      slice: vec![0; len].into_boxed_slice(),
    }
  }

  #[cfg(test)]
  pub fn from_token(num_tokens: usize, token: TermId) -> Self {
    let mut s = Self::new(num_tokens);
    s.insert(token);
    s
  }

  pub fn insert(&mut self, token: TermId) {
    self.slice[token.index() / BLOCK_NBITS] |=
      (1 as BitBlock) << (token.index() % BLOCK_NBITS);
  }

  #[cfg(test)]
  pub fn contains(&self, token: TermId) -> bool {
    let mask = (1 as BitBlock) << (token.index() % BLOCK_NBITS);
    self.slice[token.index() / BLOCK_NBITS] & mask != 0
  }

  pub fn is_empty(&self) -> bool {
    self.slice.iter().all(|&x| x == 0)
  }

  #[cfg(test)]
  pub fn is_superset(&self, other: &TokenSet) -> bool {
    self.slice.iter().zip(other.slice.iter()).all(|(&a, &b)| a & b == b)
  }

  /// Returns whether the set has changed.
  pub fn union_with(&mut self, other: &TokenSet) -> bool {
    let mut changed = false;
    for i in 0..self.slice.len() {
      let old = self.slice[i];
      self.slice[i] |= other.slice[i];
      changed |= old != self.slice[i];
    }
    changed
  }

  pub fn iter(&self) -> Iter {
    Iter {
      slice: &self.slice,
      bit: 0,
      index: 0,
    }
  }
}

/// `sets[dst] |= sets[src]`; returns whether `sets[dst]` has changed.
pub fn union_at(sets: &mut [TokenSet], dst: usize, src: usize) -> bool {
  if dst == src {
    return false;
  }
  if dst < src {
    let (left, right) = sets.split_at_mut(src);
    left[dst].union_with(&right[0])
  } else {
    let (left, right) = sets.split_at_mut(dst);
    right[0].union_with(&left[src])
  }
}

pub struct Iter<'a> {
  slice: &'a [BitBlock],
  bit: usize,
  index: usize,
}

impl<'a> Iterator for Iter<'a> {
  type Item = TermId;

  fn next(&mut self) -> Option<TermId> {
    while self.index < self.slice.len() {
      if self.bit < BLOCK_NBITS {
        let bit = (self.slice[self.index] & !((1 << self.bit) - 1))
          .trailing_zeros() as usize;
        if bit < BLOCK_NBITS {
          self.bit = bit + 1;
          return Some(TermId((self.index * BLOCK_NBITS + bit) as u32));
        }
      }

      self.index += 1;
      self.bit = 0;
    }
    None
  }
}

impl Debug for TokenSet {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.debug_set().entries(self.iter().map(|t| t.0)).finish()
  }
}
