//! Lazy traversal of a bag's entries.

use std::iter::FusedIterator;
use std::marker::PhantomData;

use crate::block::BlockRef;
use crate::chain::Chain;
use crate::entry::Entry;
use crate::sync::Ordering;

/// Iterator over the entries of a bag, produced by `iter()` on
/// [`Bag`](crate::Bag) or [`BagReader`](crate::BagReader).
///
/// Walks the main list from the head captured at creation. Blocks linked
/// later are not visited; call `iter()` again to restart from the current
/// head. Blocks with no live entries are skipped.
///
/// # Consistency
///
/// Each yielded entry is read with its own acquire load, so it is always a
/// value some writer operation stored, never a torn one. There is no
/// snapshot guarantee beyond that: while the writer removes entries, an
/// entry relocated inside a block during the walk may be skipped or, rarely,
/// yielded twice. Without concurrent mutation, a walk yields every live
/// entry exactly once.
pub struct Iter<'a, E> {
    block: Option<BlockRef<'a>>,
    index: usize,
    _entries: PhantomData<E>,
}

impl<'a, E: Entry> Iter<'a, E> {
    pub(crate) fn new(chain: &'a Chain) -> Self {
        Self {
            block: chain.head(),
            index: 0,
            _entries: PhantomData,
        }
    }
}

impl<E: Entry> Iterator for Iter<'_, E> {
    type Item = E;

    #[allow(unsafe_code)]
    fn next(&mut self) -> Option<E> {
        loop {
            let block = self.block?;
            // Re-read the count on every step: it may have grown or shrunk
            // since the last entry.
            let link = block.link(Ordering::Acquire);
            if self.index < link.count as usize {
                let word = block.slot(self.index).load(Ordering::Acquire);
                self.index += 1;
                // SAFETY: slots below a published count only ever hold words
                // stored by the writer from `E::into_word`.
                return Some(unsafe { E::from_word(word) });
            }
            self.block = link.next;
            self.index = 0;
        }
    }
}

impl<E: Entry> FusedIterator for Iter<'_, E> {}

impl<E> std::fmt::Debug for Iter<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iter")
            .field("exhausted", &self.block.is_none())
            .field("index", &self.index)
            .finish()
    }
}
