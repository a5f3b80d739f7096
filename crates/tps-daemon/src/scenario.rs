//! Scenario files for the simulated board.
//!
//! ```toml
//! initial_reset = true
//! start_at = 0          # raw clock value at boot
//!
//! [[events]]
//! kind = "int_falling"
//! at = "90ms"
//!
//! [[events]]
//! kind = "reset"
//! at = "95ms"
//! level = false
//! ```
//!
//! Event times are offsets from boot.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tps_common::config::{humantime_serde, PinConfig};
use tps_common::time::Millis;
use tps_runtime::platform::Pin;
use tps_runtime::simulated::{SimulatedPlatform, Stimulus};

/// A scripted sequence of RESET and INT activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// RESET level at boot.
    pub initial_reset: bool,
    /// Clock value at boot.
    pub start_at: u32,
    /// How long to keep running after the last event once KILL is idle.
    #[serde(with = "humantime_serde")]
    pub settle: Duration,
    /// Scheduled stimuli.
    pub events: Vec<ScenarioEvent>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            initial_reset: false,
            start_at: 0,
            settle: Duration::from_millis(50),
            events: Vec::new(),
        }
    }
}

/// One scheduled stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioEvent {
    /// Drive RESET.
    Reset {
        /// Offset from boot.
        #[serde(with = "humantime_serde")]
        at: Duration,
        /// New level.
        level: bool,
    },
    /// Pulse INT low.
    IntFalling {
        /// Offset from boot.
        #[serde(with = "humantime_serde")]
        at: Duration,
    },
}

impl ScenarioEvent {
    /// Offset from boot.
    pub fn at(&self) -> Duration {
        match self {
            ScenarioEvent::Reset { at, .. } | ScenarioEvent::IntFalling { at } => *at,
        }
    }

    fn at_ms(&self) -> u64 {
        u64::try_from(self.at().as_millis()).unwrap_or(u64::MAX)
    }

    fn stimulus(&self, pins: &PinConfig) -> Stimulus {
        match self {
            ScenarioEvent::Reset { level, .. } => Stimulus::Level {
                pin: Pin(pins.reset),
                high: *level,
            },
            ScenarioEvent::IntFalling { .. } => Stimulus::FallingEdge { pin: Pin(pins.int) },
        }
    }
}

impl Scenario {
    /// Load a scenario from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse scenario {}", path.display()))
    }

    /// Parse a scenario from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Offset of the last event in milliseconds, zero if there are none.
    pub fn last_event_ms(&self) -> u64 {
        self.events.iter().map(ScenarioEvent::at_ms).max().unwrap_or(0)
    }

    /// Offset after which the run may end, in milliseconds.
    pub fn end_ms(&self) -> u64 {
        let settle = u64::try_from(self.settle.as_millis()).unwrap_or(u64::MAX);
        self.last_event_ms().saturating_add(settle)
    }

    /// Build a simulated board with the scenario loaded.
    pub fn build_platform(&self, pins: &PinConfig, paced: bool) -> SimulatedPlatform {
        let mut sim = SimulatedPlatform::starting_at(Millis(self.start_at)).paced(paced);
        sim.set_input(Pin(pins.reset), self.initial_reset);
        for event in &self.events {
            sim.schedule(event.at_ms(), event.stimulus(pins));
        }
        sim
    }
}
