//! The bag: writer handle, reader handles and the growth policy.
//!
//! [`Bag`] is the single writer. It is not `Clone` and every mutation takes
//! `&mut self`, so the single-writer discipline is carried by the type
//! system. [`BagReader`] is a cheap, cloneable, read-only view that can be
//! sent to any number of threads.
//!
//! ```text
//! Bag (writer, exclusive)            BagReader (clone per thread)
//! ├── block table: Vec<BlockPtr>     │
//! ├── AvailableList (by ordinal)     │
//! └── Arc<Shared> ───────────────────┴──> Shared
//!                                         ├── Chain (head → B3 → B2 → B1 → B0)
//!                                         ├── n_entries
//!                                         ├── BlockInfo
//!                                         └── allocator
//! ```
//!
//! Blocks are freed when the last handle drops the shared state, which can
//! only happen once no reader is left to walk the chain.

use std::fmt;
use std::marker::PhantomData;

use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::alloc::{BlockAllocator, SystemAllocator};
use crate::avail::AvailableList;
use crate::block::{BlockPtr, RawBlock};
use crate::chain::Chain;
use crate::config::{BagConfig, BlockInfo, GrowthStrategy};
use crate::entry::Entry;
use crate::error::BagError;
use crate::iter::Iter;
use crate::stats::BagStats;
use crate::sync::{Arc, AtomicUsize, Ordering, OwnedLoad};

/// Marker keeping handles invariant in `E` while leaving `Send`/`Sync`
/// tied to `E`. A covariant handle would let a `Bag<&'static T>` be
/// shortened to `Bag<&'a T>` and hand readers dangling references.
type Invariant<E> = (E, fn(E) -> E);

/// State shared by the writer and every reader.
pub(crate) struct Shared<A: BlockAllocator> {
    pub(crate) chain: Chain,
    n_entries: AtomicUsize,
    info: BlockInfo,
    allocator: A,
}

impl<A: BlockAllocator> Shared<A> {
    pub(crate) fn contains_word(&self, word: usize) -> bool {
        self.chain.find(word).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.n_entries.load(Ordering::Relaxed)
    }
}

impl<A: BlockAllocator> Drop for Shared<A> {
    fn drop(&mut self) {
        let freed = self.chain.free_all(&self.allocator, self.info.layout);
        debug!(blocks = freed, bytes = freed * self.info.bytes, "bag destroyed");
    }
}

/// A lock-free bag with one writer and any number of concurrent readers.
///
/// Entries are unordered and may repeat. Readers never block and never
/// observe a partially written entry.
///
/// ```
/// use satchel::{Bag, BagConfig, GrowthStrategy};
///
/// let config = BagConfig::new(GrowthStrategy::Linear).with_entries_per_block(4);
/// let mut bag: Bag<usize> = Bag::new(config).unwrap();
/// let reader = bag.reader();
///
/// bag.put(7).unwrap();
/// assert!(reader.contains(7));
/// assert_eq!(reader.len(), 1);
///
/// bag.remove(7).unwrap();
/// assert!(reader.is_empty());
/// ```
///
/// The entry type cannot be shortened, so a reader never outlives what the
/// writer stores:
///
/// ```compile_fail
/// use satchel::Bag;
///
/// fn shorten<'a>(bag: Bag<&'static String>) -> Bag<&'a String> {
///     bag
/// }
/// ```
///
/// ```compile_fail
/// use satchel::BagReader;
///
/// fn shorten<'a>(reader: BagReader<&'static String>) -> BagReader<&'a String> {
///     reader
/// }
/// ```
pub struct Bag<E, A: BlockAllocator = SystemAllocator> {
    shared: Arc<Shared<A>>,
    /// Every block ever allocated, indexed by ordinal.
    blocks: Vec<BlockPtr>,
    avail: AvailableList,
    strategy: GrowthStrategy,
    growth_events: usize,
    _entries: PhantomData<Invariant<E>>,
}

/// Read-only, cloneable view of a [`Bag`].
///
/// Every operation is wait-free with respect to the writer: it walks the
/// chain with acquire loads and never blocks, spins or allocates.
pub struct BagReader<E, A: BlockAllocator = SystemAllocator> {
    shared: Arc<Shared<A>>,
    _entries: PhantomData<Invariant<E>>,
}

// Compile-time assertion: handles over plain words must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Bag<usize>>();
    assert::<BagReader<usize>>();
};

impl<E: Entry> Bag<E> {
    /// Create an empty bag using the global allocator.
    pub fn new(config: BagConfig) -> Result<Self, BagError> {
        Self::with_allocator(config, SystemAllocator)
    }
}

impl<E: Entry, A: BlockAllocator> Bag<E, A> {
    /// Create an empty bag whose blocks come from `allocator`.
    ///
    /// No block is allocated until the first [`put`](Self::put).
    pub fn with_allocator(config: BagConfig, allocator: A) -> Result<Self, BagError> {
        let info = config.block_info()?;
        debug!(
            entries_per_block = info.max,
            block_bytes = info.bytes,
            strategy = ?config.strategy,
            "bag initialised"
        );
        Ok(Self {
            shared: Arc::new(Shared {
                chain: Chain::new(),
                n_entries: AtomicUsize::new(0),
                info,
                allocator,
            }),
            blocks: Vec::new(),
            avail: AvailableList::new(),
            strategy: config.strategy,
            growth_events: 0,
            _entries: PhantomData,
        })
    }

    /// A new read-only view sharing this bag.
    pub fn reader(&self) -> BagReader<E, A> {
        BagReader {
            shared: Arc::clone(&self.shared),
            _entries: PhantomData,
        }
    }

    /// Insert `entry`.
    ///
    /// Fails only if a growth event is needed and the allocator cannot
    /// supply it; the bag is then unchanged.
    pub fn put(&mut self, entry: E) -> Result<(), BagError> {
        let target = match self.avail.head() {
            Some(ordinal) => ordinal,
            None => self.grow()?,
        };
        let max = self.shared.info.max;
        let block = self.blocks[target].get();
        let count = block.count_owned();
        debug_assert!(count < max, "block {target} on the available list is full");
        debug_assert!(self.avail.contains(target));

        // Past the published count, but a reader still holding a count from
        // before the last remove may load this slot directly.
        block.slot(count as usize).store(entry.into_word(), Ordering::Release);
        block.publish_count(count + 1);
        self.shared.n_entries.fetch_add(1, Ordering::Relaxed);

        if count + 1 == max {
            self.avail.unlink(target);
            trace!(block = target, "block full");
        }
        Ok(())
    }

    /// Replace the first slot holding `old` with `new`.
    ///
    /// Concurrent readers see either `old` or `new` in that slot, never a
    /// mixture. The number of entries is unchanged.
    pub fn set(&mut self, old: E, new: E) -> Result<(), BagError> {
        let (block, index) = self
            .shared
            .chain
            .find_owned(old.into_word())
            .ok_or(BagError::NotFound)?;
        block.slot(index).store(new.into_word(), Ordering::Release);
        Ok(())
    }

    /// Remove one slot holding `entry`.
    ///
    /// The block's last live entry moves into the vacated slot so live
    /// slots stay contiguous. A reader iterating concurrently may miss or
    /// repeat that moved entry.
    pub fn remove(&mut self, entry: E) -> Result<(), BagError> {
        let (block, index) = self
            .shared
            .chain
            .find_owned(entry.into_word())
            .ok_or(BagError::NotFound)?;
        let count = block.count_owned();
        let last = count as usize - 1;

        if index != last {
            let moved = block.slot(last).load_owned();
            block.slot(index).store(moved, Ordering::Release);
        }
        // Truncating the count drops the old last slot from view; the
        // relocated copy above is already in place.
        block.publish_count(count - 1);
        self.shared.n_entries.fetch_sub(1, Ordering::Relaxed);

        if count == self.shared.info.max {
            let ordinal = block.ordinal();
            self.avail.push_front(ordinal);
            trace!(block = ordinal, "block has capacity again");
        }
        Ok(())
    }

    /// Whether any slot holds `entry`.
    pub fn contains(&self, entry: E) -> bool {
        self.shared.contains_word(entry.into_word())
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the bag holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the live entries. See [`Iter`] for the consistency
    /// guarantees under concurrent mutation.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter::new(&self.shared.chain)
    }

    /// Per-block sizing in effect.
    pub fn block_info(&self) -> &BlockInfo {
        &self.shared.info
    }

    /// Growth policy in effect.
    pub fn strategy(&self) -> GrowthStrategy {
        self.strategy
    }

    /// Current occupancy and growth counters.
    pub fn stats(&self) -> BagStats {
        let info = &self.shared.info;
        BagStats {
            entries: self.len(),
            blocks: self.blocks.len(),
            available_blocks: self.avail.len(),
            growth_events: self.growth_events,
            entries_per_block: info.max as usize,
            block_bytes: info.bytes,
            memory_bytes: self.blocks.len() * info.bytes,
        }
    }

    /// Give up the writer handle.
    ///
    /// Blocks are returned to the allocator as soon as no reader remains;
    /// if readers are still alive, the last one to drop frees them.
    pub fn destroy(self) {
        drop(self);
    }

    /// Allocate a batch of blocks per the growth strategy and link them
    /// into both lists. Returns the ordinal of the new insertion target.
    ///
    /// The whole batch is allocated before anything is linked, so a failed
    /// allocation leaves both lists untouched.
    fn grow(&mut self) -> Result<usize, BagError> {
        let batch = match self.strategy {
            GrowthStrategy::Geometric => self.blocks.len().max(1),
            GrowthStrategy::Linear => 1,
        };
        let shared = &*self.shared;
        let layout = shared.info.layout;

        let mut fresh: SmallVec<[RawBlock; 8]> = SmallVec::with_capacity(batch);
        for _ in 0..batch {
            match RawBlock::allocate(&shared.allocator, layout) {
                Some(raw) => fresh.push(raw),
                None => {
                    warn!(
                        batch,
                        allocated = fresh.len(),
                        bytes = shared.info.bytes,
                        "block allocation failed"
                    );
                    for raw in fresh {
                        raw.release(&shared.allocator, layout);
                    }
                    return Err(BagError::AllocationFailed {
                        blocks: batch,
                        bytes: shared.info.bytes,
                    });
                }
            }
        }

        for raw in fresh {
            let ordinal = self.avail.register();
            debug_assert_eq!(ordinal, self.blocks.len());
            let block = shared
                .chain
                .link_front(raw, ordinal, shared.info.max, layout);
            self.blocks.push(block);
            self.avail.push_front(ordinal);
        }
        self.growth_events += 1;
        debug!(
            strategy = ?self.strategy,
            batch,
            blocks = self.blocks.len(),
            "bag grew"
        );
        Ok(self.blocks.len() - 1)
    }
}

impl<E: Entry, A: BlockAllocator> BagReader<E, A> {
    /// Whether any slot holds `entry`.
    pub fn contains(&self, entry: E) -> bool {
        self.shared.contains_word(entry.into_word())
    }

    /// Number of live entries. Advisory while the writer is active.
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the bag holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the live entries, starting from the current head.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter::new(&self.shared.chain)
    }
}

impl<E, A: BlockAllocator> Clone for BagReader<E, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            _entries: PhantomData,
        }
    }
}

impl<'a, E: Entry, A: BlockAllocator> IntoIterator for &'a Bag<E, A> {
    type Item = E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, E: Entry, A: BlockAllocator> IntoIterator for &'a BagReader<E, A> {
    type Item = E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: Entry, A: BlockAllocator> fmt::Debug for Bag<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bag")
            .field("strategy", &self.strategy)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<E, A: BlockAllocator> fmt::Debug for BagReader<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BagReader")
            .field("len", &self.shared.len())
            .finish()
    }
}
