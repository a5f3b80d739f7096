//! KILL output state machine.
//!
//! ```text
//!            kill verdict drained
//!   ┌──────┐ ───────────────────▶ ┌──────────┐
//!   │ IDLE │                      │ ASSERTED │ ── kill verdict: ignored
//!   └──────┘ ◀─────────────────── └──────────┘
//!     (RESET low ∧ held ≥ min_hold) ∨ held ≥ timeout
//! ```
//!
//! IDLE leaves the pin as an input with pull-up so the line floats high and
//! the monitor IC may drive it itself. ASSERTED drives it low.

use crate::platform::{Pin, Platform, PinMode};
use tps_common::state::{KillState, ReleaseReason};
use tps_common::time::Millis;
use tracing::trace;

/// Release rule for an asserted KILL line.
///
/// A clean release needs RESET low and the minimum hold satisfied; the
/// timeout releases regardless of RESET.
#[inline]
#[must_use]
pub fn release_due(
    held_ms: u32,
    reset_high: bool,
    min_hold_ms: u32,
    timeout_ms: u32,
) -> Option<ReleaseReason> {
    if !reset_high && held_ms >= min_hold_ms {
        Some(ReleaseReason::ResetDeasserted)
    } else if held_ms >= timeout_ms {
        Some(ReleaseReason::Timeout)
    } else {
        None
    }
}

/// Outcome of a release evaluation that released the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Release {
    /// Why the line was released.
    pub reason: ReleaseReason,
    /// When it had been asserted.
    pub asserted_at: Millis,
    /// How long it was held.
    pub held_ms: u32,
}

/// Owner of the KILL pin.
#[derive(Debug, Clone)]
pub struct KillDriver {
    pin: Pin,
    state: KillState,
    /// Only `Some` while asserted.
    asserted_at: Option<Millis>,
    min_hold_ms: u32,
    timeout_ms: u32,
}

impl KillDriver {
    /// Create a driver for `pin`. Call [`KillDriver::init`] before use.
    #[must_use]
    pub fn new(pin: Pin, min_hold_ms: u32, timeout_ms: u32) -> Self {
        Self {
            pin,
            state: KillState::Idle,
            asserted_at: None,
            min_hold_ms,
            timeout_ms,
        }
    }

    /// Put the pin in its idle configuration.
    pub fn init<P: Platform + ?Sized>(&mut self, platform: &mut P) {
        Self::float(platform, self.pin);
        self.state = KillState::Idle;
        self.asserted_at = None;
    }

    fn float<P: Platform + ?Sized>(platform: &mut P, pin: Pin) {
        platform.set_pin_mode(pin, PinMode::InputPullUp);
    }

    fn drive_low<P: Platform + ?Sized>(platform: &mut P, pin: Pin) {
        platform.set_pin_mode(pin, PinMode::Output);
        platform.write_level(pin, false);
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> KillState {
        self.state
    }

    /// When the line was asserted, if it is asserted.
    #[must_use]
    pub fn asserted_at(&self) -> Option<Millis> {
        self.asserted_at
    }

    /// The KILL pin.
    #[must_use]
    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Drive KILL low at `now` if idle.
    ///
    /// Returns `false` if already asserted; the running hold is not
    /// restarted or extended.
    pub fn assert<P: Platform + ?Sized>(&mut self, platform: &mut P, now: Millis) -> bool {
        if self.state.transition_to(KillState::Asserted).is_err() {
            return false;
        }
        Self::drive_low(platform, self.pin);
        self.asserted_at = Some(now);
        true
    }

    /// Release KILL if the hold/timeout rules allow it.
    pub fn poll_release<P: Platform + ?Sized>(
        &mut self,
        platform: &mut P,
        reset_high: bool,
        now: Millis,
    ) -> Option<Release> {
        let asserted_at = self.asserted_at?;
        let held_ms = now.elapsed_since(asserted_at);
        let reason = release_due(held_ms, reset_high, self.min_hold_ms, self.timeout_ms)?;

        Self::float(platform, self.pin);
        self.state = KillState::Idle;
        self.asserted_at = None;
        trace!(%reason, held_ms, "KILL floated");

        Some(Release {
            reason,
            asserted_at,
            held_ms,
        })
    }

    /// Unconditionally return the line to idle. Used on shutdown.
    pub fn force_idle<P: Platform + ?Sized>(&mut self, platform: &mut P) -> Option<Millis> {
        Self::float(platform, self.pin);
        self.state = KillState::Idle;
        self.asserted_at.take()
    }
}
