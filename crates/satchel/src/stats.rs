//! Occupancy and growth counters for a bag.
//!
//! [`BagStats`] is a point-in-time copy taken by the writer, which owns
//! the block table and the available list.

/// Occupancy and memory figures for a bag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BagStats {
    /// Live entries across all blocks.
    pub entries: usize,
    /// Blocks allocated so far. Never decreases.
    pub blocks: usize,
    /// Blocks with free capacity (members of the available list).
    pub available_blocks: usize,
    /// Number of growth events (allocator batches) so far.
    pub growth_events: usize,
    /// Slots per block.
    pub entries_per_block: usize,
    /// Bytes per block, including header and allocator overhead.
    pub block_bytes: usize,
    /// Bytes held by all blocks.
    pub memory_bytes: usize,
}

impl BagStats {
    /// Total slots across all blocks.
    pub fn capacity(&self) -> usize {
        self.blocks * self.entries_per_block
    }

    /// Fraction of slots holding live entries, in `[0, 1]`.
    ///
    /// `0.0` for a bag with no blocks.
    pub fn occupancy(&self) -> f64 {
        match self.capacity() {
            0 => 0.0,
            cap => self.entries as f64 / cap as f64,
        }
    }
}
