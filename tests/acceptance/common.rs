//! Common utilities for acceptance tests.
//!
//! Provides helpers for:
//! - Building configurations with the timing under test
//! - Booting a supervisor on a prepared simulated board
//! - Running for a span of virtual time and collecting cycle reports

#![allow(dead_code)] // Not every helper is used by every test module

use std::time::Duration;
use tps_common::config::{Profile, SupervisorConfig, TimingConfig};
use tps_common::time::Millis;
use tps_runtime::indication::{Indicator, LedIndicator, NullIndicator};
use tps_runtime::kill_driver::Release;
use tps_runtime::platform::Pin;
use tps_runtime::simulated::{SimulatedPlatform, Stimulus};
use tps_runtime::supervisor::{CycleReport, Supervisor};

pub const RESET: Pin = Pin(1);
pub const INT: Pin = Pin(2);
pub const KILL: Pin = Pin(3);
pub const LED: Pin = Pin(21);

pub type SimSupervisor = Supervisor<SimulatedPlatform, Box<dyn Indicator>>;

/// Configuration with the given profile and the two timings most tests vary.
pub fn config(profile: Profile, reset_high_min_ms: u64, kill_timeout_ms: u64) -> SupervisorConfig {
    SupervisorConfig {
        profile,
        timing: TimingConfig {
            reset_high_min_before_int: Duration::from_millis(reset_high_min_ms),
            kill_timeout: Duration::from_millis(kill_timeout_ms),
            ..TimingConfig::default()
        },
        ..SupervisorConfig::default()
    }
}

/// A board whose clock starts at `origin` with RESET at `reset_high`.
pub fn board(origin: u32, reset_high: bool) -> SimulatedPlatform {
    let mut sim = SimulatedPlatform::starting_at(Millis(origin));
    sim.set_input(RESET, reset_high);
    sim
}

pub fn int_at(sim: &mut SimulatedPlatform, at: u64) {
    sim.schedule(at, Stimulus::FallingEdge { pin: INT });
}

pub fn reset_at(sim: &mut SimulatedPlatform, at: u64, high: bool) {
    sim.schedule(at, Stimulus::Level { pin: RESET, high });
}

/// Start a supervisor with the indicator the profile calls for.
pub fn boot(sim: SimulatedPlatform, config: &SupervisorConfig) -> SimSupervisor {
    let indicator: Box<dyn Indicator> = if config.profile.uses_led() {
        Box::new(LedIndicator::from_config(LED, &config.indication).unwrap())
    } else {
        Box::new(NullIndicator)
    };
    Supervisor::start(sim, indicator, config).unwrap()
}

/// Step until `until` virtual milliseconds after boot.
pub fn run_until(supervisor: &mut SimSupervisor, until: u64) -> Vec<CycleReport> {
    let mut reports = Vec::new();
    while supervisor.platform().elapsed() < until {
        reports.push(supervisor.step());
    }
    reports
}

/// Clock values at which KILL was asserted.
pub fn assertions(reports: &[CycleReport]) -> Vec<Millis> {
    reports.iter().filter(|r| r.asserted).map(|r| r.at).collect()
}

pub fn releases(reports: &[CycleReport]) -> Vec<Release> {
    reports.iter().filter_map(|r| r.release).collect()
}

/// Number of LED "on" transitions at or after `from` on an active-low LED.
pub fn led_pulses_since(supervisor: &SimSupervisor, from: Millis) -> usize {
    supervisor
        .platform()
        .line_history(LED)
        .windows(2)
        .filter(|w| w[0].1 && !w[1].1 && w[1].0.as_u32() >= from.as_u32())
        .count()
}

/// Minimal LCG so property runs are reproducible.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    pub fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}
