//! Lock-free single-writer, multi-reader bag.
//!
//! A bag holds an unordered multiset of opaque entries (pointer-sized
//! words). One writer inserts, updates and removes; any number of readers
//! test membership and iterate concurrently without locks, spinning or
//! allocation, and never observe a partially published entry.
//!
//! # Architecture
//!
//! ```text
//! Bag (writer)  ──┐
//! BagReader × N ──┴─> Shared
//!                     ├── Chain: head → block → block → ... (append-only)
//!                     │       each block: [next|count] + slots[max]
//!                     ├── n_entries
//!                     └── BlockAllocator
//! Bag also owns the writer-private AvailableList (blocks with free slots).
//! ```
//!
//! - **Tagged chain words** ([`tag`]): a block's `next` word carries the
//!   successor address and the block's own live count, so one acquire load
//!   answers both "where next" and "how many slots are valid".
//! - **Main list**: every block ever allocated, linked at the front and never
//!   unlinked while the bag lives, so readers need no reclamation scheme.
//! - **Available list**: blocks with free capacity, for O(1) insert targets.
//! - **Growth** ([`GrowthStrategy`]): geometric (double the block count) or
//!   linear (one block) per growth event.
//!
//! # Unsafe code
//!
//! `unsafe` is confined to `block` (raw block memory), `alloc` (the system
//! allocator) and `entry` (word conversions), plus the entry rebuild in the
//! iterator and the teardown call in the chain. Under `--cfg loom` the
//! writer's own loads in `sync` are `unsync_load`s. Everything else is
//! denied.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod alloc;
mod avail;
pub mod bag;
mod block;
mod chain;
pub mod config;
pub mod entry;
pub mod error;
pub mod iter;
pub mod stats;
mod sync;
pub mod tag;

// Public re-exports for the primary API surface.
pub use alloc::{BlockAllocator, SystemAllocator};
pub use bag::{Bag, BagReader};
pub use config::{BagConfig, BlockInfo, BlockSize, GrowthStrategy};
pub use entry::Entry;
pub use error::BagError;
pub use iter::Iter;
pub use stats::BagStats;

#[cfg(doctest)]
#[doc = include_str!("../README.md")]
struct ReadmeDoctests;
