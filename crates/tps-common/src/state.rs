//! KILL line states and the transitions between them.
//!
//! The KILL driver has exactly two states:
//! IDLE (input + pull-up, line floats high) and ASSERTED (driven low).
//! Only the two crossings are legal; re-asserting while asserted is a
//! no-op handled by the driver, not a transition.

use crate::error::{SupervisorError, SupervisorResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of the KILL output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KillState {
    /// Pin is high impedance with pull-up; the monitor sees KILL deasserted.
    #[default]
    Idle,
    /// Pin is an output driven low.
    Asserted,
}

impl fmt::Display for KillState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Asserted => write!(f, "ASSERTED"),
        }
    }
}

impl KillState {
    /// Check if a transition to `target` is valid from the current state.
    #[must_use]
    pub fn can_transition_to(&self, target: KillState) -> bool {
        matches!(
            (self, target),
            (KillState::Idle, KillState::Asserted) | (KillState::Asserted, KillState::Idle)
        )
    }

    /// Attempt to transition to `target`, returning error if invalid.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::InvalidStateTransition`] for self-transitions.
    pub fn transition_to(&mut self, target: KillState) -> SupervisorResult<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(SupervisorError::InvalidStateTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// Returns true if the KILL line is being driven low.
    #[must_use]
    pub fn is_asserted(&self) -> bool {
        matches!(self, Self::Asserted)
    }
}

/// Why an asserted KILL line was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// RESET went low and the minimum hold time had passed.
    ResetDeasserted,
    /// The absolute kill timeout elapsed; RESET never confirmed the kill.
    Timeout,
}

impl ReleaseReason {
    /// Whether this release indicates a misbehaving RESET line.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResetDeasserted => write!(f, "reset_deasserted"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// A sampled RESET level change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetEdge {
    /// RESET went high (supervised device powered / held).
    Rising,
    /// RESET went low.
    Falling,
}

impl fmt::Display for ResetEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rising => write!(f, "rising"),
            Self::Falling => write!(f, "falling"),
        }
    }
}
