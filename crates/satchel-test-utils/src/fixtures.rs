//! Reusable allocator test fixtures.
//!
//! Three allocators for exercising the block allocator seam:
//!
//! - [`CountingAllocator`]: delegates to the system allocator and keeps
//!   allocation, free and live-byte counters.
//! - [`FailingAllocator`]: succeeds a configurable number of times, then
//!   refuses every request until the limit is raised.
//! - [`UntaggableAllocator`]: hands out an address with the tag bits set.

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use satchel::{BlockAllocator, SystemAllocator};

/// System allocator with counters.
///
/// Share it through an `Arc` to inspect the counters after the bag that
/// used it is gone.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    allocations: AtomicUsize,
    frees: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl CountingAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful allocations so far.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    /// Frees so far.
    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }

    /// Allocations not yet freed.
    pub fn live(&self) -> usize {
        self.allocations() - self.frees()
    }

    /// Bytes currently allocated.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }
}

impl BlockAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let block = SystemAllocator.allocate(layout)?;
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_add(layout.size(), Ordering::Relaxed);
        Some(block)
    }

    unsafe fn free(&self, block: NonNull<u8>, layout: Layout) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
        // SAFETY: `block` came from `SystemAllocator` in `allocate`.
        unsafe { SystemAllocator.free(block, layout) }
    }
}

/// Succeeds `limit` allocations in total, then fails.
///
/// Uses atomics for the counters so it satisfies `Send + Sync`.
#[derive(Debug)]
pub struct FailingAllocator {
    inner: CountingAllocator,
    limit: AtomicUsize,
    refused: AtomicUsize,
}

impl FailingAllocator {
    /// Create an allocator that grants `limit` allocations then fails.
    pub fn new(limit: usize) -> Self {
        Self {
            inner: CountingAllocator::new(),
            limit: AtomicUsize::new(limit),
            refused: AtomicUsize::new(0),
        }
    }

    /// Change the total number of allocations granted.
    pub fn set_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::Relaxed);
    }

    /// Requests refused so far.
    pub fn refused(&self) -> usize {
        self.refused.load(Ordering::Relaxed)
    }

    /// Counters of the granted allocations.
    pub fn counts(&self) -> &CountingAllocator {
        &self.inner
    }
}

impl BlockAllocator for FailingAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if self.inner.allocations() >= self.limit.load(Ordering::Relaxed) {
            self.refused.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.inner.allocate(layout)
    }

    unsafe fn free(&self, block: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract; every granted block came from `inner`.
        unsafe { self.inner.free(block, layout) }
    }
}

/// Returns an address with bits set above bit 48 and never real memory.
///
/// A bag must reject the address and hand it straight back.
#[derive(Debug, Default)]
pub struct UntaggableAllocator {
    handed_out: AtomicUsize,
    returned: AtomicUsize,
}

impl UntaggableAllocator {
    /// The bogus address handed out.
    pub const ADDRESS: u64 = 0xFFFF_8000_0000_1000;

    pub fn new() -> Self {
        Self::default()
    }

    /// Addresses handed out so far.
    pub fn handed_out(&self) -> usize {
        self.handed_out.load(Ordering::Relaxed)
    }

    /// Addresses given back so far.
    pub fn returned(&self) -> usize {
        self.returned.load(Ordering::Relaxed)
    }
}

impl BlockAllocator for UntaggableAllocator {
    fn allocate(&self, _layout: Layout) -> Option<NonNull<u8>> {
        self.handed_out.fetch_add(1, Ordering::Relaxed);
        NonNull::new(std::ptr::without_provenance_mut(Self::ADDRESS as usize))
    }

    unsafe fn free(&self, block: NonNull<u8>, _layout: Layout) {
        assert_eq!(block.as_ptr().addr() as u64, Self::ADDRESS);
        self.returned.fetch_add(1, Ordering::Relaxed);
    }
}
