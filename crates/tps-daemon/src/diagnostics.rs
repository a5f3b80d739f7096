//! End-of-run summary.

use serde::Serialize;
use std::time::Duration;
use tps_common::metrics::SupervisorStats;

/// Why the poll loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// SIGTERM or SIGINT.
    Signal,
    /// `--max-iterations` reached.
    MaxIterations,
    /// Every scenario event was applied and KILL settled idle.
    ScenarioComplete,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Signal => write!(f, "signal"),
            StopReason::MaxIterations => write!(f, "max_iterations"),
            StopReason::ScenarioComplete => write!(f, "scenario_complete"),
        }
    }
}

/// Summary printed with `--summary-json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Daemon version.
    pub version: &'static str,
    /// Active profile.
    pub profile: String,
    /// Why the loop stopped.
    pub stop_reason: StopReason,
    /// Clock value at boot.
    pub clock_start: u32,
    /// Clock value at stop.
    pub clock_end: u32,
    /// Simulated milliseconds elapsed.
    pub virtual_elapsed_ms: u64,
    /// Host time spent in the run.
    pub wall_time_ms: u64,
    /// Whether KILL was still asserted when the stop was requested.
    pub kill_forced_idle: bool,
    /// Stop signals received.
    pub signals: u32,
    /// Supervisor counters.
    pub stats: SupervisorStats,
}

impl RunSummary {
    /// Render as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn wall_ms(wall: Duration) -> u64 {
        u64::try_from(wall.as_millis()).unwrap_or(u64::MAX)
    }
}
