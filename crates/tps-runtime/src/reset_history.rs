//! RESET level history.
//!
//! RESET is push-pull and clean, so it is sampled by the poll loop instead of
//! being interrupt driven. The tracker remembers when the line last went high
//! so the interrupt handler can ask how long it has been held.

use tps_common::state::ResetEdge;
use tps_common::time::Millis;

/// Returns true if a line that went high at `high_since` has been high for at
/// least `min_ms` as of `now`.
///
/// `None` means the line was low immediately before `now`.
#[inline]
#[must_use]
pub fn held_for_at_least(high_since: Option<Millis>, now: Millis, min_ms: u32) -> bool {
    match high_since {
        Some(since) => now.elapsed_since(since) >= min_ms,
        None => false,
    }
}

/// Sampled RESET state plus the time of the most recent assertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetHistory {
    level: bool,
    high_since: Option<Millis>,
}

impl ResetHistory {
    /// Seed the tracker from the level sampled at boot.
    #[must_use]
    pub fn new(level: bool, now: Millis) -> Self {
        Self {
            level,
            high_since: level.then_some(now),
        }
    }

    /// Feed a new sample. Returns the edge if the level changed.
    pub fn observe(&mut self, level: bool, now: Millis) -> Option<ResetEdge> {
        if level == self.level {
            return None;
        }
        self.level = level;
        if level {
            self.high_since = Some(now);
            Some(ResetEdge::Rising)
        } else {
            self.high_since = None;
            Some(ResetEdge::Falling)
        }
    }

    /// Last sampled level.
    #[must_use]
    pub fn level(&self) -> bool {
        self.level
    }

    /// When RESET last went high, if it is still high.
    #[must_use]
    pub fn high_since(&self) -> Option<Millis> {
        self.high_since
    }

    /// Has RESET been continuously high for at least `min_ms` as of `now`?
    #[must_use]
    pub fn held_for(&self, now: Millis, min_ms: u32) -> bool {
        held_for_at_least(self.high_since, now, min_ms)
    }
}
