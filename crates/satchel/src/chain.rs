//! The main list: an append-only chain of every block in the bag.
//!
//! New blocks are linked at the front and nothing is ever unlinked until
//! the chain itself is dropped. That is what lets readers walk it with
//! nothing more than acquire loads: a block reachable once stays reachable
//! and allocated.
//!
//! # Publish protocol
//!
//! - Linking: the block is fully initialised (count 0, successor = old
//!   head) before a release store makes it the new head.
//! - Counts: a slot is written first, then the block's `next` word is
//!   re-stored with the new count under release ordering. A reader that
//!   acquires the word sees every slot below the count it decodes.
//! - Slots: every slot store is a release store too. A reader may still
//!   hold a count from before a remove and load a slot the writer has
//!   since refilled.
//! - The writer reads its own atomics through [`OwnedLoad`], never with
//!   the acquire loads readers use.

use std::alloc::Layout;
use std::ptr;

use crate::alloc::BlockAllocator;
use crate::block::{self, BlockPtr, BlockRef, RawBlock};
use crate::sync::{AtomicPtr, Ordering, OwnedLoad};

/// Head of the main list.
pub(crate) struct Chain {
    head: AtomicPtr<block::BlockHeader>,
}

impl Chain {
    pub(crate) fn new() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// The current first block, loaded with acquire ordering.
    pub(crate) fn head(&self) -> Option<BlockRef<'_>> {
        BlockRef::from_head(self.head.load(Ordering::Acquire))
    }

    /// Initialise `raw` as an empty block and make it the new head.
    ///
    /// Writer only.
    pub(crate) fn link_front(
        &self,
        raw: RawBlock,
        ordinal: usize,
        capacity: u16,
        layout: Layout,
    ) -> BlockPtr {
        let old_head = self.head.load_owned();
        let successor = BlockRef::from_head(old_head).map_or(0, BlockRef::address);
        let block = raw.init(ordinal, capacity, successor, layout);
        self.head.store(block.as_ptr(), Ordering::Release);
        block
    }

    /// Walk every block from the head, yielding each block with the live
    /// count decoded from the same load that yields its successor.
    pub(crate) fn blocks(&self) -> Blocks<'_> {
        Blocks {
            cursor: self.head(),
        }
    }

    /// Find the first slot holding `word`. Returns the block and index.
    pub(crate) fn find(&self, word: usize) -> Option<(BlockRef<'_>, usize)> {
        self.blocks().find_map(|(block, count)| {
            (0..count as usize)
                .find(|&i| block.slot(i).load(Ordering::Acquire) == word)
                .map(|i| (block, i))
        })
    }

    /// [`find`](Self::find) for the writer, loading only what it stored
    /// itself.
    pub(crate) fn find_owned(&self, word: usize) -> Option<(BlockRef<'_>, usize)> {
        let mut cursor = BlockRef::from_head(self.head.load_owned());
        while let Some(block) = cursor {
            let link = block.link_owned();
            let count = link.count as usize;
            if let Some(i) = (0..count).find(|&i| block.slot(i).load_owned() == word) {
                return Some((block, i));
            }
            cursor = link.next;
        }
        None
    }

    /// Free every block. Returns how many were freed.
    ///
    /// Requires `&mut self`: no reader can be walking the chain.
    #[allow(unsafe_code)]
    pub(crate) fn free_all<A: BlockAllocator + ?Sized>(
        &mut self,
        allocator: &A,
        layout: Layout,
    ) -> usize {
        let head = self.head.swap(ptr::null_mut(), Ordering::Relaxed);
        // SAFETY: exclusive access to the chain; every block was allocated
        // from `allocator` with `layout` by the owning bag.
        unsafe { block::free_chain(head, allocator, layout) }
    }
}

/// Iterator over `(block, live count)` pairs of a chain.
pub(crate) struct Blocks<'a> {
    cursor: Option<BlockRef<'a>>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = (BlockRef<'a>, u16);

    fn next(&mut self) -> Option<Self::Item> {
        let block = self.cursor?;
        let link = block.link(Ordering::Acquire);
        self.cursor = link.next;
        Some((block, link.count))
    }
}
