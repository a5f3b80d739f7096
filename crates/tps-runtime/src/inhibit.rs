//! Startup kill-inhibit window.
//!
//! Right after the supervised device powers up, INT can fall as part of the
//! normal start sequence. While the window is open every kill decision is
//! forced to "no". The window closes when RESET drops or after a maximum
//! duration.

use tps_common::time::Millis;

/// Time-bounded suppression of kill decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupInhibit {
    armed_at: Option<Millis>,
    max_ms: u32,
}

impl StartupInhibit {
    /// Create a closed window with the given maximum duration.
    #[must_use]
    pub const fn new(max_ms: u32) -> Self {
        Self {
            armed_at: None,
            max_ms,
        }
    }

    /// Open (or re-open) the window at `now`.
    pub fn arm(&mut self, now: Millis) {
        self.armed_at = Some(now);
    }

    /// Whether kill decisions are currently suppressed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.armed_at.is_some()
    }

    /// When the window was opened, if it is open.
    #[must_use]
    pub fn armed_at(&self) -> Option<Millis> {
        self.armed_at
    }

    /// Close the window if RESET is low or the maximum duration has elapsed.
    ///
    /// Returns `true` if this call closed the window.
    pub fn update(&mut self, reset_high: bool, now: Millis) -> bool {
        let Some(armed_at) = self.armed_at else {
            return false;
        };
        if !reset_high || now.elapsed_since(armed_at) >= self.max_ms {
            self.armed_at = None;
            return true;
        }
        false
    }
}
