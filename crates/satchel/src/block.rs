//! Block memory layout and raw block lifetime.
//!
//! A block is a single allocation: a fixed header followed by `capacity`
//! pointer-sized slots.
//!
//! ```text
//! ┌──────────────┬─────────┬──────────┬────────┬────────┬─────┬──────────────┐
//! │ next (tagged)│ ordinal │ capacity │ slot 0 │ slot 1 │ ... │ slot cap - 1 │
//! └──────────────┴─────────┴──────────┴────────┴────────┴─────┴──────────────┘
//! ```
//!
//! `next` is the only mutable part of the header. It holds the successor
//! address and this block's live count (see [`crate::tag`]). `ordinal` and
//! `capacity` are written once before the block is published and never
//! change. Slots `[0, count)` hold live entries; the rest are unused.
//!
//! This module owns every raw pointer operation in the crate. Outside it,
//! blocks are reached through [`BlockRef`], whose methods are safe.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

use crate::alloc::BlockAllocator;
use crate::sync::{AtomicU64, AtomicUsize, Ordering, OwnedLoad};
use crate::tag;

#[repr(C)]
pub(crate) struct BlockHeader {
    next: AtomicU64,
    ordinal: usize,
    capacity: usize,
}

/// Byte offset of slot 0 from the start of a block.
pub(crate) const SLOTS_OFFSET: usize =
    size_of::<BlockHeader>().next_multiple_of(align_of::<AtomicUsize>());

/// Size of one slot in bytes.
pub(crate) const SLOT_BYTES: usize = size_of::<AtomicUsize>();

const BLOCK_ALIGN: usize = if align_of::<BlockHeader>() > align_of::<AtomicUsize>() {
    align_of::<BlockHeader>()
} else {
    align_of::<AtomicUsize>()
};

/// Allocation layout of a block holding `capacity` slots.
///
/// Returns `None` if the size overflows.
pub(crate) fn layout_for(capacity: usize) -> Option<Layout> {
    let slots = capacity.checked_mul(SLOT_BYTES)?;
    let size = SLOTS_OFFSET.checked_add(slots)?;
    Layout::from_size_align(size, BLOCK_ALIGN).ok()
}

/// Freshly allocated, uninitialised block memory.
pub(crate) struct RawBlock(NonNull<u8>);

impl RawBlock {
    /// Ask `allocator` for one block.
    ///
    /// Memory whose address cannot be tagged is handed straight back and
    /// reported as a failed allocation.
    pub(crate) fn allocate<A: BlockAllocator + ?Sized>(
        allocator: &A,
        layout: Layout,
    ) -> Option<Self> {
        let memory = allocator.allocate(layout)?;
        if !tag::is_taggable(memory.as_ptr().addr()) {
            tracing::warn!(
                address = memory.as_ptr().addr(),
                "allocator returned an address with tag bits set"
            );
            // SAFETY: just allocated with this layout, never initialised.
            unsafe { allocator.free(memory, layout) };
            return None;
        }
        Some(Self(memory))
    }

    /// Return the memory without ever having initialised it.
    pub(crate) fn release<A: BlockAllocator + ?Sized>(self, allocator: &A, layout: Layout) {
        // SAFETY: `self` owns memory obtained from `allocator` with `layout`.
        unsafe { allocator.free(self.0, layout) };
    }

    /// Write the header and empty slots. The block's `next` word points at
    /// `successor` with a count of zero.
    ///
    /// `layout` must be the layout the memory was allocated with, and must
    /// come from [`layout_for`]`(capacity)`.
    pub(crate) fn init(self, ordinal: usize, capacity: u16, successor: usize, layout: Layout) -> BlockPtr {
        let capacity = capacity as usize;
        assert!(
            layout_for(capacity).is_some_and(|l| l.size() <= layout.size()),
            "block layout too small for {capacity} slots"
        );
        let header = self.0.cast::<BlockHeader>();
        // SAFETY: the allocation is at least `layout_for(capacity)` bytes
        // and aligned for both the header and the slots; nothing else can
        // see this memory until the block is linked into a chain.
        unsafe {
            header.as_ptr().write(BlockHeader {
                next: AtomicU64::new(tag::encode(successor, 0)),
                ordinal,
                capacity,
            });
            let slots = self.0.as_ptr().add(SLOTS_OFFSET).cast::<AtomicUsize>();
            for i in 0..capacity {
                slots.add(i).write(AtomicUsize::new(0));
            }
        }
        BlockPtr(header)
    }
}

/// Pointer to an initialised block, held by the writer's block table.
///
/// Carries no ownership: blocks are owned by the chain and freed by
/// [`free_chain`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BlockPtr(NonNull<BlockHeader>);

// SAFETY: a `BlockPtr` is only an address. All shared access to the block
// goes through atomics, and the plain header fields are immutable after
// initialisation.
unsafe impl Send for BlockPtr {}
// SAFETY: see `Send`.
unsafe impl Sync for BlockPtr {}

impl BlockPtr {
    /// Borrow the block for as long as the pointer is borrowed.
    ///
    /// Valid because the holder of a `BlockPtr` also keeps the owning chain
    /// alive.
    pub(crate) fn get(&self) -> BlockRef<'_> {
        BlockRef::new(self.0)
    }

    pub(crate) fn as_ptr(self) -> *mut BlockHeader {
        self.0.as_ptr()
    }
}

/// Shared borrow of a published block.
#[derive(Clone, Copy)]
pub(crate) struct BlockRef<'a> {
    ptr: NonNull<BlockHeader>,
    _chain: PhantomData<&'a BlockHeader>,
}

/// A decoded `next` word.
#[derive(Clone, Copy)]
pub(crate) struct Link<'a> {
    /// Live entries in the block the word was loaded from.
    pub(crate) count: u16,
    /// The following block in the chain.
    pub(crate) next: Option<BlockRef<'a>>,
}

impl<'a> BlockRef<'a> {
    fn new(ptr: NonNull<BlockHeader>) -> Self {
        Self {
            ptr,
            _chain: PhantomData,
        }
    }

    /// Borrow the block at `ptr`, or `None` for null.
    ///
    /// `ptr` must be null or point at a block of a chain that outlives `'a`.
    pub(crate) fn from_head(ptr: *mut BlockHeader) -> Option<Self> {
        NonNull::new(ptr).map(Self::new)
    }

    fn header(self) -> &'a BlockHeader {
        // SAFETY: blocks stay allocated for as long as their chain lives,
        // which `'a` is bounded by.
        unsafe { self.ptr.as_ref() }
    }

    /// Load and decode this block's `next` word.
    pub(crate) fn link(self, order: Ordering) -> Link<'a> {
        Self::decode(self.header().next.load(order))
    }

    fn decode(word: u64) -> Link<'a> {
        let address = tag::decode_address(word);
        Link {
            count: tag::decode_count(word),
            next: NonNull::new(ptr::with_exposed_provenance_mut::<BlockHeader>(address))
                .map(Self::new),
        }
    }

    /// Load and decode this block's `next` word from the writer, which is
    /// the only thread that stores it.
    pub(crate) fn link_owned(self) -> Link<'a> {
        Self::decode(self.header().next.load_owned())
    }

    /// This block's live count, as last published by the writer.
    pub(crate) fn count_owned(self) -> u16 {
        tag::decode_count(self.header().next.load_owned())
    }

    /// Publish a new live count with a release store, keeping the
    /// successor address.
    ///
    /// Only the writer may call this; every slot write the new count
    /// exposes must already be done.
    pub(crate) fn publish_count(self, count: u16) {
        debug_assert!(count as usize <= self.capacity());
        let next = &self.header().next;
        let word = next.load_owned();
        next.store(tag::with_count(word, count), Ordering::Release);
    }

    /// Slot `index` of this block.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the block's capacity.
    pub(crate) fn slot(self, index: usize) -> &'a AtomicUsize {
        let capacity = self.capacity();
        assert!(index < capacity, "slot {index} out of range for capacity {capacity}");
        // SAFETY: `index < capacity` and the block was initialised with
        // `capacity` slots starting at `SLOTS_OFFSET`.
        unsafe {
            &*self
                .ptr
                .as_ptr()
                .cast::<u8>()
                .add(SLOTS_OFFSET)
                .cast::<AtomicUsize>()
                .add(index)
        }
    }

    /// Position of this block in the writer's block table.
    pub(crate) fn ordinal(self) -> usize {
        self.header().ordinal
    }

    /// Number of slots.
    pub(crate) fn capacity(self) -> usize {
        self.header().capacity
    }

    /// Address of the block, with its provenance exposed so it can be
    /// rebuilt from a tagged word.
    pub(crate) fn address(self) -> usize {
        self.ptr.as_ptr().expose_provenance()
    }

    #[cfg(test)]
    pub(crate) fn ptr_eq(self, other: BlockRef<'_>) -> bool {
        self.ptr == other.ptr
    }
}

/// Free every block reachable from `head`. Returns the number freed.
///
/// # Safety
///
/// Every block in the chain must have been allocated from `allocator` with
/// `layout`, and no other reference to any of them may exist or be created
/// afterwards.
pub(crate) unsafe fn free_chain<A: BlockAllocator + ?Sized>(
    head: *mut BlockHeader,
    allocator: &A,
    layout: Layout,
) -> usize {
    let mut freed = 0;
    let mut cursor = NonNull::new(head);
    while let Some(block) = cursor {
        // SAFETY: the caller guarantees exclusive access to a live chain.
        unsafe {
            let header = block.as_ptr();
            let word = (*header).next.load(Ordering::Relaxed);
            let capacity = (*header).capacity;
            cursor = NonNull::new(ptr::with_exposed_provenance_mut::<BlockHeader>(
                tag::decode_address(word),
            ));
            let slots = block.as_ptr().cast::<u8>().add(SLOTS_OFFSET).cast::<AtomicUsize>();
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(slots, capacity));
            ptr::drop_in_place(header);
            allocator.free(block.cast::<u8>(), layout);
        }
        freed += 1;
    }
    freed
}
