//! Synchronization primitives, swapped for `loom` under `--cfg loom`.
//!
//! Every atomic the bag touches goes through this module so the publish
//! protocol can be model-checked without changing the engine code.

#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};
#[cfg(not(loom))]
pub(crate) use std::sync::Arc;

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::Arc;

/// Load of an atomic by the only thread that ever stores to it.
///
/// Relaxed on std. Under loom this is an `unsync_load`, which is not
/// recorded as the cell's last access, so a reader's earlier load stays
/// visible to the scheduler when the writer stores next.
pub(crate) trait OwnedLoad {
    type Value;

    fn load_owned(&self) -> Self::Value;
}

macro_rules! owned_load {
    ($($atomic:ty => $value:ty),* $(,)?) => {$(
        impl OwnedLoad for $atomic {
            type Value = $value;

            #[cfg(not(loom))]
            #[inline]
            fn load_owned(&self) -> $value {
                self.load(Ordering::Relaxed)
            }

            #[cfg(loom)]
            #[allow(unsafe_code)]
            fn load_owned(&self) -> $value {
                // SAFETY: only the calling thread stores to this atomic, and
                // every store it made happens-before this load.
                unsafe { self.unsync_load() }
            }
        }
    )*};
}

owned_load!(AtomicU64 => u64, AtomicUsize => usize);

impl<T> OwnedLoad for AtomicPtr<T> {
    type Value = *mut T;

    #[cfg(not(loom))]
    #[inline]
    fn load_owned(&self) -> *mut T {
        self.load(Ordering::Relaxed)
    }

    #[cfg(loom)]
    #[allow(unsafe_code)]
    fn load_owned(&self) -> *mut T {
        // SAFETY: see the integer impls above.
        unsafe { self.unsync_load() }
    }
}
