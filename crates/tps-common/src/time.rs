//! Millisecond clock values and wraparound-safe arithmetic.
//!
//! The platform clock is a free-running `u32` millisecond counter that wraps
//! after roughly 49.7 days. Every elapsed-time computation in the workspace
//! goes through [`Millis::elapsed_since`], which uses wrapping subtraction and
//! is therefore correct across a wrap as long as the measured interval is
//! shorter than the full counter range.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A timestamp from the platform's wrapping millisecond counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Millis(pub u32);

impl Millis {
    /// Counter value at boot on most platforms.
    pub const ZERO: Millis = Millis(0);

    /// Raw counter value.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, tolerant of counter wrap.
    #[inline]
    #[must_use]
    pub const fn elapsed_since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// Timestamp `ms` milliseconds after `self`, wrapping at the counter modulus.
    #[inline]
    #[must_use]
    pub const fn wrapping_add(self, ms: u32) -> Millis {
        Millis(self.0.wrapping_add(ms))
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<u32> for Millis {
    fn from(ms: u32) -> Self {
        Millis(ms)
    }
}

/// Marks a stored word as carrying a timestamp.
const PRESENT: u64 = 1 << 32;

static_assertions::const_assert!(PRESENT > u32::MAX as u64);

/// An `Option<Millis>` stored in a single atomic word.
///
/// Presence and value are packed together so a reader in interrupt context
/// can never observe a present flag paired with a stale timestamp.
#[derive(Debug, Default)]
pub struct AtomicTimestamp(AtomicU64);

impl AtomicTimestamp {
    /// Create a new slot holding `value`.
    #[must_use]
    pub const fn new(value: Option<Millis>) -> Self {
        Self(AtomicU64::new(Self::pack(value)))
    }

    #[inline]
    const fn pack(value: Option<Millis>) -> u64 {
        match value {
            Some(Millis(ms)) => PRESENT | ms as u64,
            None => 0,
        }
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    const fn unpack(word: u64) -> Option<Millis> {
        if word & PRESENT == 0 {
            None
        } else {
            Some(Millis(word as u32))
        }
    }

    /// Load the stored timestamp.
    #[inline]
    pub fn load(&self, order: Ordering) -> Option<Millis> {
        Self::unpack(self.0.load(order))
    }

    /// Store a new timestamp (or clear it with `None`).
    #[inline]
    pub fn store(&self, value: Option<Millis>, order: Ordering) {
        self.0.store(Self::pack(value), order);
    }
}
