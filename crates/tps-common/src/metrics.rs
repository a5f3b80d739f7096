//! Supervisor statistics.
//!
//! Counters are owned by the poll loop and updated without allocation.
//! The interrupt handler never touches them.

use crate::state::{ReleaseReason, ResetEdge};
use serde::{Deserialize, Serialize};

/// Running counters describing what the supervisor has done since boot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorStats {
    /// Poll loop iterations completed.
    pub iterations: u64,
    /// Sampled RESET rising edges.
    pub reset_rising: u64,
    /// Sampled RESET falling edges.
    pub reset_falling: u64,
    /// Interrupt events drained from the latch.
    pub events_drained: u64,
    /// Drained events whose decision was "kill".
    pub kill_decisions: u64,
    /// KILL assertions performed.
    pub kills_asserted: u64,
    /// Kill decisions that arrived while KILL was already asserted.
    pub kills_ignored: u64,
    /// Startup inhibit windows armed.
    pub inhibits_armed: u64,
    /// Releases after RESET deasserted.
    pub clean_releases: u64,
    /// Forced releases after the kill timeout.
    pub timeout_releases: u64,
    /// Longest time KILL has been held, in milliseconds.
    pub longest_hold_ms: u32,
}

impl SupervisorStats {
    /// Create zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sampled RESET edge.
    pub fn record_reset_edge(&mut self, edge: ResetEdge) {
        match edge {
            ResetEdge::Rising => self.reset_rising += 1,
            ResetEdge::Falling => self.reset_falling += 1,
        }
    }

    /// Record a drained interrupt event and its decision.
    pub fn record_event(&mut self, kill: bool) {
        self.events_drained += 1;
        if kill {
            self.kill_decisions += 1;
        }
    }

    /// Record a release after holding KILL for `held_ms`.
    pub fn record_release(&mut self, reason: ReleaseReason, held_ms: u32) {
        match reason {
            ReleaseReason::ResetDeasserted => self.clean_releases += 1,
            ReleaseReason::Timeout => self.timeout_releases += 1,
        }
        self.longest_hold_ms = self.longest_hold_ms.max(held_ms);
    }

    /// Total releases of either kind.
    #[must_use]
    pub fn releases(&self) -> u64 {
        self.clean_releases + self.timeout_releases
    }
}
