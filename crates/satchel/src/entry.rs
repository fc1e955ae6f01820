//! Opaque entry references.
//!
//! The bag stores every entry as one pointer-sized word so that a slot can
//! be written and read with a single atomic access. [`Entry`] is the
//! conversion between a caller's value and that word. Two entries are the
//! same entry when their words are equal: for references this is identity,
//! not `PartialEq` of the pointee.

#![allow(unsafe_code)]

use std::num::NonZeroUsize;
use std::ptr::NonNull;

/// A value that can live in a bag slot.
///
/// # Safety
///
/// `from_word(into_word(x))` must reproduce `x` exactly, and `into_word`
/// must be injective. The bag relies on this to hand back stored values
/// from their words.
pub unsafe trait Entry: Copy {
    /// The word stored in the slot for this entry.
    fn into_word(self) -> usize;

    /// Rebuild an entry from a word previously produced by
    /// [`into_word`](Self::into_word).
    ///
    /// # Safety
    ///
    /// `word` must have been produced by `into_word` on a value of this
    /// type that is still valid to use.
    unsafe fn from_word(word: usize) -> Self;
}

// SAFETY: identity conversion.
unsafe impl Entry for usize {
    #[inline]
    fn into_word(self) -> usize {
        self
    }

    #[inline]
    unsafe fn from_word(word: usize) -> Self {
        word
    }
}

// SAFETY: zero-extension is injective and truncation inverts it.
unsafe impl Entry for u32 {
    #[inline]
    fn into_word(self) -> usize {
        self as usize
    }

    #[inline]
    unsafe fn from_word(word: usize) -> Self {
        word as u32
    }
}

// SAFETY: the word of a `NonZeroUsize` is never zero.
unsafe impl Entry for NonZeroUsize {
    #[inline]
    fn into_word(self) -> usize {
        self.get()
    }

    #[inline]
    unsafe fn from_word(word: usize) -> Self {
        // SAFETY: `word` came from `into_word`, hence non-zero.
        unsafe { NonZeroUsize::new_unchecked(word) }
    }
}

// SAFETY: the word is the pointer's address with exposed provenance, and
// is turned back into a pointer with that provenance.
unsafe impl<T> Entry for NonNull<T> {
    #[inline]
    fn into_word(self) -> usize {
        self.as_ptr().expose_provenance()
    }

    #[inline]
    unsafe fn from_word(word: usize) -> Self {
        // SAFETY: `word` came from a non-null pointer.
        unsafe { NonNull::new_unchecked(std::ptr::with_exposed_provenance_mut(word)) }
    }
}

// SAFETY: as for `NonNull`; the caller guarantees the referent is still
// alive for `'a` when rebuilding.
unsafe impl<'a, T> Entry for &'a T {
    #[inline]
    fn into_word(self) -> usize {
        (self as *const T).expose_provenance()
    }

    #[inline]
    unsafe fn from_word(word: usize) -> Self {
        // SAFETY: `word` came from a `&'a T`.
        unsafe { &*std::ptr::with_exposed_provenance::<T>(word) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_their_own_words() {
        assert_eq!(42usize.into_word(), 42);
        assert_eq!(7u32.into_word(), 7);
        assert_eq!(unsafe { u32::from_word(7) }, 7);
    }

    #[test]
    fn references_compare_by_identity() {
        let a = String::from("same");
        let b = String::from("same");
        assert_eq!(a, b);
        assert_ne!((&a).into_word(), (&b).into_word());

        let back: &String = unsafe { Entry::from_word((&a).into_word()) };
        assert!(std::ptr::eq(back, &a));
    }

    #[test]
    fn non_null_round_trips() {
        let mut value = 5u64;
        let ptr = NonNull::from(&mut value);
        let back: NonNull<u64> = unsafe { Entry::from_word(ptr.into_word()) };
        assert_eq!(back, ptr);
    }
}
