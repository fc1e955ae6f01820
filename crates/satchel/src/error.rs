//! Bag error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur while configuring or mutating a bag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BagError {
    /// A block was configured to hold zero entries.
    ZeroCapacity,
    /// The requested entries-per-block does not fit in the 16-bit count tag.
    CapacityUnrepresentable {
        /// Number of entries per block that was requested or derived.
        requested: usize,
        /// Largest count the tag can hold.
        max: usize,
    },
    /// The block budget cannot hold the header, the allocator overhead and
    /// at least one slot.
    BlockTooSmall {
        /// Total bytes available per block.
        block_bytes: usize,
        /// Bytes needed for the header, overhead and one slot.
        required: usize,
    },
    /// The block layout for this many entries overflows `isize`.
    BlockLayout {
        /// Number of entries per block.
        entries: usize,
    },
    /// The allocator could not supply memory for a growth event. The bag
    /// is left exactly as it was before the call.
    AllocationFailed {
        /// Number of blocks the growth event asked for.
        blocks: usize,
        /// Size of each block in bytes.
        bytes: usize,
    },
    /// No slot holds the requested entry. The bag is unchanged.
    NotFound,
}

impl fmt::Display for BagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCapacity => write!(f, "blocks must hold at least one entry"),
            Self::CapacityUnrepresentable { requested, max } => {
                write!(
                    f,
                    "{requested} entries per block cannot be tagged, at most {max} are supported"
                )
            }
            Self::BlockTooSmall {
                block_bytes,
                required,
            } => {
                write!(
                    f,
                    "block of {block_bytes} bytes is too small, at least {required} bytes required"
                )
            }
            Self::BlockLayout { entries } => {
                write!(f, "block layout for {entries} entries overflows")
            }
            Self::AllocationFailed { blocks, bytes } => {
                write!(
                    f,
                    "allocation failed: {blocks} block(s) of {bytes} bytes could not be obtained"
                )
            }
            Self::NotFound => write!(f, "entry not found"),
        }
    }
}

impl Error for BagError {}

impl BagError {
    /// Whether this error was raised while deriving the block configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ZeroCapacity
                | Self::CapacityUnrepresentable { .. }
                | Self::BlockTooSmall { .. }
                | Self::BlockLayout { .. }
        )
    }
}
