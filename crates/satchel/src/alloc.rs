//! The block allocator collaborator.
//!
//! Blocks are obtained from a [`BlockAllocator`] supplied at construction.
//! The bag only asks for memory of a given [`Layout`] and hands it back on
//! teardown; it places no other requirements on the allocator.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::ptr::NonNull;

/// Allocate/free pair used for every block of a bag.
///
/// Implementations must be thread-safe: the bag's shared state (and with
/// it the allocator) is dropped by whichever handle goes last.
pub trait BlockAllocator: Send + Sync {
    /// Allocate memory for `layout`, or `None` if none is available.
    ///
    /// The returned memory must be valid for reads and writes of
    /// `layout.size()` bytes and aligned to `layout.align()`.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Return memory obtained from [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// `block` must have been returned by `allocate` on this allocator
    /// with the same `layout`, and must not be used afterwards.
    unsafe fn free(&self, block: NonNull<u8>, layout: Layout);
}

/// Allocator backed by the process-wide global allocator.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl BlockAllocator for SystemAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: `layout` has a non-zero size.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn free(&self, block: NonNull<u8>, layout: Layout) {
        // SAFETY: the caller guarantees `block` came from `allocate` with
        // this layout, which is `std::alloc::alloc`.
        unsafe { std::alloc::dealloc(block.as_ptr(), layout) }
    }
}

impl<A: BlockAllocator + ?Sized> BlockAllocator for &A {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn free(&self, block: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { (**self).free(block, layout) }
    }
}

impl<A: BlockAllocator + ?Sized> BlockAllocator for std::sync::Arc<A> {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn free(&self, block: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded contract.
        unsafe { (**self).free(block, layout) }
    }
}
