//! Integration test: block accounting against an instrumented allocator.
//!
//! Verifies that every block a bag obtains is returned exactly once (by
//! the writer or by the last reader), and that a failed growth event
//! hands back any partial batch and leaves the bag as it was.

#![cfg(not(loom))]

use std::sync::Arc;

use satchel::{BagConfig, BagError, GrowthStrategy};
use satchel_test_utils::{
    word_bag_in, CountingAllocator, FailingAllocator, Multiset, UntaggableAllocator,
};

#[test]
fn every_block_is_freed_when_the_bag_drops() {
    let alloc = Arc::new(CountingAllocator::new());
    let mut bag = word_bag_in(4, GrowthStrategy::Linear, Arc::clone(&alloc));
    for v in 0..17 {
        bag.put(v).unwrap();
    }
    let stats = bag.stats();
    assert_eq!(stats.blocks, 5);
    assert_eq!(alloc.live(), 5);
    assert_eq!(alloc.live_bytes(), stats.memory_bytes);

    bag.destroy();
    assert_eq!(alloc.allocations(), 5);
    assert_eq!(alloc.frees(), 5);
    assert_eq!(alloc.live_bytes(), 0);
}

#[test]
fn last_reader_frees_the_blocks() {
    let alloc = Arc::new(CountingAllocator::new());
    let mut bag = word_bag_in(2, GrowthStrategy::Geometric, Arc::clone(&alloc));
    for v in 0..6 {
        bag.put(v).unwrap();
    }
    let reader = bag.reader();
    let second = reader.clone();
    bag.destroy();
    assert_eq!(alloc.frees(), 0, "readers still hold the chain");
    assert_eq!(reader.len(), 6);

    drop(reader);
    assert_eq!(alloc.frees(), 0);
    assert!(Multiset::collect(second.iter()).same_contents(&Multiset::collect(0..6usize)));

    drop(second);
    assert_eq!(alloc.live(), 0);
}

#[test]
fn empty_bag_allocates_nothing() {
    let alloc = Arc::new(CountingAllocator::new());
    let bag = word_bag_in(8, GrowthStrategy::Geometric, Arc::clone(&alloc));
    assert!(bag.is_empty());
    drop(bag);
    assert_eq!(alloc.allocations(), 0);
    assert_eq!(alloc.frees(), 0);
}

#[test]
fn removals_never_return_blocks_early() {
    let alloc = Arc::new(CountingAllocator::new());
    let mut bag = word_bag_in(2, GrowthStrategy::Linear, Arc::clone(&alloc));
    for v in 0..8 {
        bag.put(v).unwrap();
    }
    for v in 0..8 {
        bag.remove(v).unwrap();
    }
    assert!(bag.is_empty());
    assert_eq!(bag.stats().blocks, 4);
    assert_eq!(bag.stats().available_blocks, 4);
    assert_eq!(alloc.frees(), 0);

    // Emptied blocks are reused instead of growing.
    for v in 0..8 {
        bag.put(v).unwrap();
    }
    assert_eq!(alloc.allocations(), 4);
}

#[test]
fn failed_growth_leaves_bag_unchanged() {
    let alloc = FailingAllocator::new(1);
    let mut bag = word_bag_in(2, GrowthStrategy::Linear, &alloc);
    bag.put(1).unwrap();
    bag.put(2).unwrap();
    let before = bag.stats();

    let err = bag.put(3).unwrap_err();
    assert_eq!(
        err,
        BagError::AllocationFailed {
            blocks: 1,
            bytes: before.block_bytes,
        }
    );
    assert_eq!(bag.stats(), before);
    assert!(!bag.contains(3));
    assert!(Multiset::collect(bag.iter()).same_contents(&Multiset::collect([1usize, 2])));

    // Once memory is available again the same insert succeeds.
    alloc.set_limit(2);
    bag.put(3).unwrap();
    assert_eq!(bag.len(), 3);
    assert_eq!(bag.stats().blocks, 2);
    drop(bag);
    assert_eq!(alloc.counts().live(), 0);
}

#[test]
fn partial_geometric_batch_is_returned() {
    // Growth events ask for 1, 1, 2, 4 blocks. Three grants cover the first
    // two events and half of the third.
    let alloc = FailingAllocator::new(3);
    let mut bag = word_bag_in(1, GrowthStrategy::Geometric, &alloc);
    bag.put(10).unwrap();
    bag.put(11).unwrap();
    assert_eq!(bag.stats().blocks, 2);

    let err = bag.put(12).unwrap_err();
    assert!(matches!(err, BagError::AllocationFailed { blocks: 2, .. }));
    assert_eq!(alloc.counts().allocations(), 3);
    assert_eq!(alloc.counts().frees(), 1, "the half batch went back");
    assert_eq!(alloc.refused(), 1);

    let stats = bag.stats();
    assert_eq!(stats.blocks, 2);
    assert_eq!(stats.growth_events, 2);
    assert_eq!(stats.available_blocks, 0);
    assert_eq!(bag.len(), 2);

    alloc.set_limit(5);
    bag.put(12).unwrap();
    assert_eq!(bag.stats().blocks, 4);
    assert_eq!(bag.stats().growth_events, 3);
}

#[test]
fn failure_on_first_growth_keeps_bag_empty() {
    let alloc = FailingAllocator::new(0);
    let mut bag = word_bag_in(4, GrowthStrategy::Geometric, &alloc);
    assert!(bag.put(1).is_err());
    assert!(bag.is_empty());
    assert_eq!(bag.iter().count(), 0);
    assert_eq!(bag.stats().blocks, 0);
}

#[cfg(target_pointer_width = "64")]
#[test]
fn untaggable_addresses_are_handed_back() {
    let alloc = UntaggableAllocator::new();
    let mut bag = word_bag_in(4, GrowthStrategy::Linear, &alloc);
    assert!(matches!(
        bag.put(1),
        Err(BagError::AllocationFailed { blocks: 1, .. })
    ));
    assert_eq!(alloc.handed_out(), 1);
    assert_eq!(alloc.returned(), 1);
    assert!(bag.is_empty());
    drop(bag);
    assert_eq!(alloc.returned(), 1);
}

#[test]
fn allocator_overhead_is_charged_to_every_block() {
    let plain = BagConfig::new(GrowthStrategy::Linear)
        .with_entries_per_block(8)
        .block_info()
        .unwrap();
    let padded = BagConfig::new(GrowthStrategy::Linear)
        .with_entries_per_block(8)
        .with_allocator_overhead(16)
        .block_info()
        .unwrap();
    assert_eq!(padded.max, plain.max);
    assert_eq!(padded.bytes, plain.bytes + 16);
    assert_eq!(padded.layout(), plain.layout());

    let alloc = Arc::new(CountingAllocator::new());
    let mut bag = satchel::Bag::with_allocator(
        BagConfig::new(GrowthStrategy::Linear)
            .with_entries_per_block(8)
            .with_allocator_overhead(16),
        Arc::clone(&alloc),
    )
    .unwrap();
    bag.put(1usize).unwrap();
    // The allocator sees the layout; the overhead is bookkeeping only.
    assert_eq!(alloc.live_bytes(), padded.layout().size());
    assert_eq!(bag.stats().memory_bytes, padded.bytes);
}
