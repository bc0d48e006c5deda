//! Stable, compact identifiers for components and wires.

use std::sync::atomic::{AtomicU64, Ordering};

/// An identifier type backed by a monotonically increasing counter.
pub trait Id: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    fn to_bits(self) -> u64;
    fn from_bits(val: u64) -> Self;
}

macro_rules! def_id_type {
    ($(#[$attr:meta])* $id_vis:vis $id_name:ident) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        $id_vis struct $id_name(u64);

        impl crate::id::Id for $id_name {
            #[inline]
            fn to_bits(self) -> u64 {
                self.0
            }

            #[inline]
            fn from_bits(val: u64) -> Self {
                Self(val)
            }
        }

        impl std::fmt::Display for $id_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}
pub(crate) use def_id_type;

/// Mints fresh, never-reused ids.
///
/// Kept as an atomic counter (rather than a plain `u64`) so the generator
/// can be shared with test helpers without extra plumbing; the kernel
/// itself is single-threaded end to end (see crate docs) and never
/// contends on it.
pub(crate) struct IdGenerator<T: Id> {
    next: AtomicU64,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Id> Default for IdGenerator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Id> IdGenerator<T> {
    pub(crate) const fn new() -> Self {
        Self {
            next: AtomicU64::new(0),
            _marker: std::marker::PhantomData,
        }
    }

    pub(crate) fn next(&self) -> T {
        let bits = self.next.fetch_add(1, Ordering::Relaxed);
        T::from_bits(bits)
    }
}
