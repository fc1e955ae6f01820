//! Tagged chain words.
//!
//! A block's `next` word carries two things at once: the address of the
//! successor block in the low 48 bits, and the number of live entries in
//! the block itself in the high 16 bits. One acquire load of the word tells
//! a reader both where to go next and how many slots of the current block
//! are valid.
//!
//! ```text
//!  63            48 47                                            0
//! ┌────────────────┬───────────────────────────────────────────────┐
//! │   live count   │               successor address               │
//! └────────────────┴───────────────────────────────────────────────┘
//! ```
//!
//! These are the only functions in the crate that manipulate the bit
//! layout; everything else goes through [`encode`], [`decode_address`] and
//! [`decode_count`].

/// Bit position of the live-entry count.
pub const COUNT_SHIFT: u32 = 48;

/// Mask selecting the count bits of a chain word.
pub const COUNT_MASK: u64 = 0xFFFF << COUNT_SHIFT;

/// Mask selecting the address bits of a chain word.
pub const ADDRESS_MASK: u64 = !COUNT_MASK;

/// Largest count representable in the tag.
pub const MAX_COUNT: u16 = u16::MAX;

/// Whether `address` can be packed into a chain word without losing bits.
#[inline]
pub const fn is_taggable(address: usize) -> bool {
    (address as u64) & COUNT_MASK == 0
}

/// Pack a successor address and a live-entry count into one chain word.
///
/// `address` must satisfy [`is_taggable`]; this is checked in debug builds.
#[inline]
pub fn encode(address: usize, count: u16) -> u64 {
    debug_assert!(
        is_taggable(address),
        "address {address:#x} has bits set above bit {COUNT_SHIFT}"
    );
    ((count as u64) << COUNT_SHIFT) | (address as u64 & ADDRESS_MASK)
}

/// The successor address stored in a chain word, with the count masked off.
#[inline]
pub const fn decode_address(word: u64) -> usize {
    (word & ADDRESS_MASK) as usize
}

/// The live-entry count stored in a chain word.
#[inline]
pub const fn decode_count(word: u64) -> u16 {
    (word >> COUNT_SHIFT) as u16
}

/// Replace the count of a chain word, keeping its address.
#[inline]
pub fn with_count(word: u64, count: u16) -> u64 {
    encode(decode_address(word), count)
}
