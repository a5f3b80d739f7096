//! INT edge debounce filter.
//!
//! Runs inside the interrupt handler, so it does one comparison and at most
//! one timestamp write per edge.

use tps_common::time::Millis;

/// Rejects edges that follow the last accepted edge too closely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Debounce {
    /// Minimum spacing between accepted edges.
    window_ms: u32,
    /// Timestamp of the last accepted edge; `None` until the first one.
    last_accepted: Option<Millis>,
}

impl Debounce {
    /// Create a filter with the given window.
    #[must_use]
    pub const fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            last_accepted: None,
        }
    }

    /// Offer an edge at `now`.
    ///
    /// Returns `true` and remembers `now` if the edge is accepted. Rejected
    /// edges leave the filter untouched, so a burst of chatter cannot keep
    /// pushing the window forward.
    #[inline]
    pub fn accept(&mut self, now: Millis) -> bool {
        if let Some(last) = self.last_accepted {
            if now.elapsed_since(last) < self.window_ms {
                return false;
            }
        }
        self.last_accepted = Some(now);
        true
    }

    /// Timestamp of the last accepted edge.
    #[must_use]
    pub fn last_accepted(&self) -> Option<Millis> {
        self.last_accepted
    }

    /// Forget the last accepted edge.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
