//! Test utilities and mock types for Satchel development.
//!
//! Provides mock implementations of [`BlockAllocator`] (see [`fixtures`])
//! and a [`Multiset`] reference model to check a bag against.

#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CountingAllocator, FailingAllocator, UntaggableAllocator};

use indexmap::IndexMap;
use satchel::{Bag, BagConfig, BlockAllocator, Entry, GrowthStrategy};

/// Reference model of a bag: entry → multiplicity.
///
/// Insertion-ordered so that failing property tests print reproducible
/// contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Multiset {
    counts: IndexMap<usize, usize>,
    len: usize,
}

impl Multiset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, value: usize) {
        *self.counts.entry(value).or_default() += 1;
        self.len += 1;
    }

    /// Remove one occurrence. Returns whether one was present.
    pub fn remove(&mut self, value: usize) -> bool {
        match self.counts.get_mut(&value) {
            Some(n) => {
                *n -= 1;
                if *n == 0 {
                    self.counts.shift_remove(&value);
                }
                self.len -= 1;
                true
            }
            None => false,
        }
    }

    /// Replace one occurrence of `old` with `new`. Returns whether `old`
    /// was present.
    pub fn set(&mut self, old: usize, new: usize) -> bool {
        if !self.remove(old) {
            return false;
        }
        self.put(new);
        true
    }

    pub fn contains(&self, value: usize) -> bool {
        self.counts.contains_key(&value)
    }

    pub fn count_of(&self, value: usize) -> usize {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Distinct values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts.keys().copied()
    }

    /// Build the multiset of everything `entries` yields.
    pub fn collect<E: Entry>(entries: impl IntoIterator<Item = E>) -> Self {
        let mut set = Self::new();
        for e in entries {
            set.put(e.into_word());
        }
        set
    }

    /// Whether `other` holds the same values with the same multiplicities,
    /// regardless of insertion order.
    pub fn same_contents(&self, other: &Multiset) -> bool {
        self.len == other.len
            && self
                .counts
                .iter()
                .all(|(v, n)| other.counts.get(v) == Some(n))
    }
}

/// A bag of words with `max` entries per block.
pub fn word_bag(max: usize, strategy: GrowthStrategy) -> Bag<usize> {
    Bag::new(BagConfig::new(strategy).with_entries_per_block(max))
        .expect("test bag configuration is valid")
}

/// A bag of words with `max` entries per block drawing on `allocator`.
pub fn word_bag_in<A: BlockAllocator>(
    max: usize,
    strategy: GrowthStrategy,
    allocator: A,
) -> Bag<usize, A> {
    Bag::with_allocator(
        BagConfig::new(strategy).with_entries_per_block(max),
        allocator,
    )
    .expect("test bag configuration is valid")
}
