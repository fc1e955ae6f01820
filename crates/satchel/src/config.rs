//! Bag configuration parameters.

use std::alloc::Layout;

use crate::block::{self, SLOTS_OFFSET, SLOT_BYTES};
use crate::error::BagError;
use crate::tag;

/// How a bag grows when every block is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GrowthStrategy {
    /// Allocate as many new blocks as already exist (at least one), doubling
    /// the block count on every growth event. Fewer allocator calls under
    /// sustained inserts, higher peak memory.
    #[default]
    Geometric,
    /// Allocate exactly one block per growth event.
    Linear,
}

/// How large each block is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockSize {
    /// One page ([`BagConfig::DEFAULT_BLOCK_BYTES`]) per block, including
    /// the header and allocator overhead.
    #[default]
    Default,
    /// Exactly this many entries per block.
    Entries(usize),
    /// Blocks spanning this many cache lines of
    /// [`BagConfig::CACHE_LINE_BYTES`], including header and overhead.
    CacheLines(usize),
}

/// Configuration for a bag.
///
/// Validated once by [`block_info`](Self::block_info) when the bag is
/// built; immutable afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BagConfig {
    /// Per-block capacity.
    pub block_size: BlockSize,

    /// Growth policy applied when no block has free capacity.
    pub strategy: GrowthStrategy,

    /// Bytes the allocator embeds alongside every block.
    ///
    /// Charged against page- and cache-line-sized budgets and included in
    /// [`BlockInfo::bytes`]. Default: 0.
    pub allocator_overhead: usize,
}

impl BagConfig {
    /// Block budget used by [`BlockSize::Default`].
    pub const DEFAULT_BLOCK_BYTES: usize = 4096;

    /// Cache line size used by [`BlockSize::CacheLines`].
    pub const CACHE_LINE_BYTES: usize = 64;

    /// Create a config with default block size for the given strategy.
    pub fn new(strategy: GrowthStrategy) -> Self {
        Self {
            block_size: BlockSize::Default,
            strategy,
            allocator_overhead: 0,
        }
    }

    /// Use exactly `entries` slots per block.
    pub fn with_entries_per_block(mut self, entries: usize) -> Self {
        self.block_size = BlockSize::Entries(entries);
        self
    }

    /// Size blocks to span `lines` cache lines.
    pub fn with_cache_lines(mut self, lines: usize) -> Self {
        self.block_size = BlockSize::CacheLines(lines);
        self
    }

    /// Account for `bytes` of allocator bookkeeping per block.
    pub fn with_allocator_overhead(mut self, bytes: usize) -> Self {
        self.allocator_overhead = bytes;
        self
    }

    /// Validate the config and derive per-block sizing.
    pub fn block_info(&self) -> Result<BlockInfo, BagError> {
        let max = match self.block_size {
            BlockSize::Entries(entries) => entries,
            BlockSize::Default => self.entries_within(Self::DEFAULT_BLOCK_BYTES)?,
            BlockSize::CacheLines(lines) => {
                let budget = lines
                    .checked_mul(Self::CACHE_LINE_BYTES)
                    .ok_or(BagError::BlockLayout { entries: usize::MAX })?;
                self.entries_within(budget)?
            }
        };

        if max == 0 {
            return Err(BagError::ZeroCapacity);
        }
        if max > tag::MAX_COUNT as usize {
            return Err(BagError::CapacityUnrepresentable {
                requested: max,
                max: tag::MAX_COUNT as usize,
            });
        }
        let layout = block::layout_for(max).ok_or(BagError::BlockLayout { entries: max })?;
        let bytes = layout
            .size()
            .checked_add(self.allocator_overhead)
            .ok_or(BagError::BlockLayout { entries: max })?;

        Ok(BlockInfo {
            max: max as u16,
            bytes,
            layout,
        })
    }

    /// How many slots fit in `budget` bytes after header and overhead.
    fn entries_within(&self, budget: usize) -> Result<usize, BagError> {
        let required = SLOTS_OFFSET
            .saturating_add(self.allocator_overhead)
            .saturating_add(SLOT_BYTES);
        if budget < required {
            return Err(BagError::BlockTooSmall {
                block_bytes: budget,
                required,
            });
        }
        Ok((budget - SLOTS_OFFSET - self.allocator_overhead) / SLOT_BYTES)
    }
}

/// Per-block sizing derived from a [`BagConfig`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    /// Entries per block.
    pub max: u16,
    /// Bytes per block, including header and allocator overhead.
    pub bytes: usize,
    pub(crate) layout: Layout,
}

impl BlockInfo {
    /// Layout requested from the allocator for each block.
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_block_fills_one_page() {
        let info = BagConfig::default().block_info().unwrap();
        assert_eq!(
            info.max as usize,
            (BagConfig::DEFAULT_BLOCK_BYTES - SLOTS_OFFSET) / SLOT_BYTES
        );
        assert!(info.bytes <= BagConfig::DEFAULT_BLOCK_BYTES);
        assert!(info.bytes + SLOT_BYTES > BagConfig::DEFAULT_BLOCK_BYTES);
    }

    #[test]
    fn overhead_shrinks_default_capacity() {
        let plain = BagConfig::default().block_info().unwrap();
        let padded = BagConfig::default()
            .with_allocator_overhead(64)
            .block_info()
            .unwrap();
        assert_eq!(plain.max as usize - padded.max as usize, 64 / SLOT_BYTES);
        assert!(padded.bytes <= BagConfig::DEFAULT_BLOCK_BYTES);
    }

    #[test]
    fn explicit_entries_are_kept() {
        let info = BagConfig::new(GrowthStrategy::Linear)
            .with_entries_per_block(4)
            .with_allocator_overhead(16)
            .block_info()
            .unwrap();
        assert_eq!(info.max, 4);
        assert_eq!(info.bytes, SLOTS_OFFSET + 4 * SLOT_BYTES + 16);
        assert_eq!(info.layout().size(), SLOTS_OFFSET + 4 * SLOT_BYTES);
    }

    #[test]
    fn cache_line_blocks() {
        let info = BagConfig::default().with_cache_lines(2).block_info().unwrap();
        assert_eq!(
            info.max as usize,
            (2 * BagConfig::CACHE_LINE_BYTES - SLOTS_OFFSET) / SLOT_BYTES
        );
        assert!(info.bytes <= 2 * BagConfig::CACHE_LINE_BYTES);
    }

    #[test]
    fn zero_entries_rejected() {
        let err = BagConfig::default()
            .with_entries_per_block(0)
            .block_info()
            .unwrap_err();
        assert_eq!(err, BagError::ZeroCapacity);
    }

    #[test]
    fn largest_tag_accepted_one_more_rejected() {
        let info = BagConfig::default()
            .with_entries_per_block(65_535)
            .block_info()
            .unwrap();
        assert_eq!(info.max, u16::MAX);

        let err = BagConfig::default()
            .with_entries_per_block(65_536)
            .block_info()
            .unwrap_err();
        assert_eq!(
            err,
            BagError::CapacityUnrepresentable {
                requested: 65_536,
                max: 65_535
            }
        );
    }

    #[test]
    fn overhead_larger_than_page_rejected() {
        let err = BagConfig::default()
            .with_allocator_overhead(BagConfig::DEFAULT_BLOCK_BYTES)
            .block_info()
            .unwrap_err();
        assert!(matches!(err, BagError::BlockTooSmall { block_bytes: 4096, .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn huge_cache_line_count_is_unrepresentable() {
        let err = BagConfig::default()
            .with_cache_lines(1 << 20)
            .block_info()
            .unwrap_err();
        assert!(matches!(err, BagError::CapacityUnrepresentable { .. }));
    }

    #[test]
    fn default_strategy_is_geometric() {
        assert_eq!(BagConfig::default().strategy, GrowthStrategy::Geometric);
        assert_eq!(BagConfig::default().block_size, BlockSize::Default);
    }
}
