//! Benchmark profiles and utilities for Satchel.
//!
//! - [`filled_bag`]: a bag pre-loaded with `n` distinct entries
//! - [`churn_values`]: deterministic value stream via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use satchel::{Bag, BagConfig, GrowthStrategy};

/// Entries per block for the small-block profiles.
pub const SMALL_BLOCK: usize = 16;

/// Both growth strategies, labelled for benchmark group names.
pub const STRATEGIES: [(&str, GrowthStrategy); 2] = [
    ("geometric", GrowthStrategy::Geometric),
    ("linear", GrowthStrategy::Linear),
];

/// Build a bag holding the values `1..=n`.
///
/// `entries_per_block` of `None` uses page-sized blocks.
pub fn filled_bag(strategy: GrowthStrategy, entries_per_block: Option<usize>, n: usize) -> Bag<usize> {
    let mut config = BagConfig::new(strategy);
    if let Some(max) = entries_per_block {
        config = config.with_entries_per_block(max);
    }
    let mut bag = Bag::new(config).unwrap();
    for v in 1..=n {
        bag.put(v).unwrap();
    }
    bag
}

/// `count` values in `1..=n`, drawn deterministically from `seed`.
pub fn churn_values(n: usize, count: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| (rng.next_u64() as usize) % n + 1)
        .collect()
}
