//! Poll-loop supervisor.
//!
//! Ties the pieces together. Each iteration:
//! 1. Sample RESET, update the history, publish it to the interrupt handler,
//!    and start the power-on or power-off indication on a change.
//! 2. Close the startup inhibit window once RESET is low or it expired.
//! 3. Drain the interrupt latch and assert KILL on a kill verdict.
//! 4. Re-read RESET and evaluate the release rules.
//! 5. Advance the indication.
//! 6. Sleep for the poll interval.
//!
//! The poll interval sleep is the only wait. Only setup can fail. Once
//! started, [`Supervisor::poll_once`] always completes and an asserted KILL
//! is always released within the timeout.

use crate::indication::Indicator;
use crate::inhibit::StartupInhibit;
use crate::kill_driver::{KillDriver, Release};
use crate::latch::{InterruptEvent, InterruptLatch, LatchShared};
use crate::platform::{Pin, Platform, PinMode};
use crate::reset_history::ResetHistory;
use std::sync::Arc;
use tps_common::config::{Profile, SupervisorConfig, Timing};
use tps_common::error::SupervisorResult;
use tps_common::metrics::SupervisorStats;
use tps_common::state::{KillState, ReleaseReason, ResetEdge};
use tps_common::time::Millis;
use tracing::{debug, info, trace, warn};

/// What happened during one poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Clock value when the iteration started.
    pub at: Millis,
    /// RESET transition observed by the sample.
    pub reset_edge: Option<ResetEdge>,
    /// Whether the inhibit window closed this iteration.
    pub inhibit_cleared: bool,
    /// Interrupt verdict drained this iteration.
    pub event: Option<InterruptEvent>,
    /// Whether KILL went from idle to asserted.
    pub asserted: bool,
    /// Release performed this iteration.
    pub release: Option<Release>,
}

impl CycleReport {
    fn new(at: Millis) -> Self {
        Self {
            at,
            reset_edge: None,
            inhibit_cleared: false,
            event: None,
            asserted: false,
            release: None,
        }
    }
}

/// The KILL supervisor.
pub struct Supervisor<P: Platform, I: Indicator> {
    platform: P,
    indicator: I,
    profile: Profile,
    timing: Timing,
    reset_pin: Pin,
    history: ResetHistory,
    inhibit: StartupInhibit,
    kill: KillDriver,
    latch: Arc<LatchShared>,
    stats: SupervisorStats,
}

impl<P: Platform, I: Indicator> Supervisor<P, I> {
    /// Configure the pins and attach the INT handler.
    ///
    /// If RESET is already high the inhibit window is armed (profile
    /// permitting) and the power-on indication starts before the handler is
    /// attached, so no edge from the boot sequence can be decided without
    /// the inhibit in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the platform
    /// refuses the interrupt registration.
    pub fn start(mut platform: P, mut indicator: I, config: &SupervisorConfig) -> SupervisorResult<Self> {
        config.validate()?;
        let timing = config.resolve_timing()?;
        let reset_pin = Pin(config.pins.reset);
        let int_pin = Pin(config.pins.int);

        platform.set_pin_mode(reset_pin, PinMode::Input);
        platform.set_pin_mode(int_pin, PinMode::InputPullUp);
        indicator.init(&mut platform);

        let mut kill = KillDriver::new(
            Pin(config.pins.kill),
            timing.kill_min_hold_ms,
            timing.kill_timeout_ms,
        );
        kill.init(&mut platform);

        let now = platform.now();
        let level = platform.read_level(reset_pin);
        let history = ResetHistory::new(level, now);
        let latch = Arc::new(LatchShared::new());
        latch.publish_reset_high_since(history.high_since());

        let mut supervisor = Self {
            platform,
            indicator,
            profile: config.profile,
            timing,
            reset_pin,
            history,
            inhibit: StartupInhibit::new(timing.inhibit_max_ms),
            kill,
            latch,
            stats: SupervisorStats::new(),
        };

        if level {
            info!(at = %now, "RESET high at boot");
            supervisor.power_on(now);
        }

        let handler = InterruptLatch::new(
            Arc::clone(&supervisor.latch),
            timing.int_debounce_ms,
            timing.reset_high_min_ms,
        )
        .into_handler();
        supervisor.platform.on_falling_edge(int_pin, handler)?;

        info!(
            profile = %supervisor.profile,
            reset = %reset_pin,
            int = %int_pin,
            kill = %supervisor.kill.pin(),
            reset_high = level,
            "Supervisor started"
        );
        Ok(supervisor)
    }

    /// Arm the inhibit (profile permitting) and start the power-on indication.
    fn power_on(&mut self, now: Millis) {
        if self.profile.uses_startup_inhibit() {
            self.inhibit.arm(now);
            self.latch.publish_inhibit(true);
            self.stats.inhibits_armed += 1;
            debug!(at = %now, max_ms = self.timing.inhibit_max_ms, "Startup inhibit armed");
        }
        self.indicator.reset_asserted(&mut self.platform);
    }

    /// Run one iteration without the trailing sleep.
    pub fn poll_once(&mut self) -> CycleReport {
        let mut report = CycleReport::new(self.platform.now());

        // 1. RESET sample
        let reset_high = self.platform.read_level(self.reset_pin);
        let sampled_at = self.platform.now();
        if let Some(edge) = self.history.observe(reset_high, sampled_at) {
            self.stats.record_reset_edge(edge);
            report.reset_edge = Some(edge);
            match edge {
                ResetEdge::Rising => {
                    info!(at = %sampled_at, "RESET asserted");
                    // Inhibit goes out before the new high_since so the
                    // handler never sees a fresh assertion without it
                    self.power_on(sampled_at);
                    self.latch.publish_reset_high_since(self.history.high_since());
                }
                ResetEdge::Falling => {
                    info!(at = %sampled_at, "RESET deasserted");
                    self.latch.publish_reset_high_since(None);
                    self.indicator.reset_deasserted(&mut self.platform);
                }
            }
        }

        // 2. Inhibit expiry
        if self.inhibit.update(reset_high, self.platform.now()) {
            self.latch.publish_inhibit(false);
            report.inhibit_cleared = true;
            debug!(reset_high, "Startup inhibit cleared");
        }

        // 3. Drain
        if let Some(event) = self.latch.take(&self.platform) {
            report.event = Some(event);
            report.asserted = self.handle_event(event);
        }

        // 4. Release
        if self.kill.state().is_asserted() {
            let reset_high = self.platform.read_level(self.reset_pin);
            let now = self.platform.now();
            if let Some(release) = self.kill.poll_release(&mut self.platform, reset_high, now) {
                self.stats.record_release(release.reason, release.held_ms);
                match release.reason {
                    ReleaseReason::ResetDeasserted => info!(
                        asserted_at = %release.asserted_at,
                        held_ms = release.held_ms,
                        "KILL released"
                    ),
                    ReleaseReason::Timeout => warn!(
                        asserted_at = %release.asserted_at,
                        held_ms = release.held_ms,
                        "KILL timeout: RESET never deasserted, forcing release"
                    ),
                }
                self.indicator.kill_released(&mut self.platform, release.reason);
                report.release = Some(release);
            }
        }

        // 5. Indication
        self.indicator.tick(&mut self.platform);

        self.stats.iterations += 1;
        report
    }

    fn handle_event(&mut self, event: InterruptEvent) -> bool {
        self.stats.record_event(event.kill);
        if !event.kill {
            debug!(fired_at = %event.fired_at, "INT edge did not qualify for kill");
            return false;
        }

        let now = self.platform.now();
        if self.kill.assert(&mut self.platform, now) {
            self.stats.kills_asserted += 1;
            info!(fired_at = %event.fired_at, asserted_at = %now, "KILL asserted");
            self.indicator.kill_asserted(&mut self.platform);
            true
        } else {
            self.stats.kills_ignored += 1;
            debug!(fired_at = %event.fired_at, "Kill verdict ignored, KILL already asserted");
            false
        }
    }

    /// Run one iteration and then sleep for the poll interval.
    pub fn step(&mut self) -> CycleReport {
        let report = self.poll_once();
        self.platform.sleep(self.timing.poll_interval_ms);
        trace!(iteration = self.stats.iterations, "Poll iteration complete");
        report
    }

    /// Step until `stop` returns true. Returns the number of iterations run.
    pub fn run_until<F>(&mut self, mut stop: F) -> u64
    where
        F: FnMut(&Self, &CycleReport) -> bool,
    {
        info!("Entering poll loop");
        let mut iterations = 0;
        loop {
            let report = self.step();
            iterations += 1;
            if stop(self, &report) {
                break;
            }
        }
        info!(iterations, kill_state = %self.kill.state(), "Poll loop exited");
        iterations
    }

    /// Return KILL to idle regardless of the hold rules.
    ///
    /// Returns the assertion time if KILL was asserted.
    pub fn shutdown(&mut self) -> Option<Millis> {
        let asserted_at = self.kill.force_idle(&mut self.platform);
        self.indicator.halt(&mut self.platform);
        if let Some(at) = asserted_at {
            warn!(asserted_at = %at, "KILL released on shutdown");
        }
        info!("Supervisor stopped");
        asserted_at
    }

    /// Statistics gathered so far.
    #[must_use]
    pub fn stats(&self) -> &SupervisorStats {
        &self.stats
    }

    /// Current KILL state.
    #[must_use]
    pub fn kill_state(&self) -> KillState {
        self.kill.state()
    }

    /// When KILL was asserted, if it is.
    #[must_use]
    pub fn asserted_at(&self) -> Option<Millis> {
        self.kill.asserted_at()
    }

    /// Whether the startup inhibit window is open.
    #[must_use]
    pub fn inhibit_active(&self) -> bool {
        self.inhibit.is_active()
    }

    /// Whether an interrupt verdict is waiting to be drained.
    #[must_use]
    pub fn event_pending(&self) -> bool {
        self.latch.is_pending()
    }

    /// Sampled RESET history.
    #[must_use]
    pub fn history(&self) -> &ResetHistory {
        &self.history
    }

    /// Active profile.
    #[must_use]
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Resolved timing.
    #[must_use]
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// The platform.
    #[must_use]
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutable access to the platform.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Tear the supervisor apart.
    pub fn into_parts(self) -> (P, I, SupervisorStats) {
        (self.platform, self.indicator, self.stats)
    }
}
