//! Status indication.
//!
//! The poll loop reports RESET and KILL events to an [`Indicator`] and calls
//! [`Indicator::tick`] once per iteration. Indicators never sleep: the LED
//! implementation starts a [`BlinkPattern`] on an event and advances it from
//! the clock on each tick, so a running blink never delays the drain or the
//! release check.

use crate::platform::{Pin, Platform, PinMode};
use tps_common::config::{to_clock_ms, ConfigError, IndicationConfig};
use tps_common::state::ReleaseReason;
use tps_common::time::Millis;
use tracing::debug;

/// Receiver of supervisor events that should be made visible.
///
/// Implementations must return without waiting.
pub trait Indicator {
    /// Configure indication hardware. Called once during startup.
    fn init(&mut self, _platform: &mut dyn Platform) {}

    /// RESET went high (or was high at boot).
    fn reset_asserted(&mut self, _platform: &mut dyn Platform) {}

    /// RESET went low.
    fn reset_deasserted(&mut self, _platform: &mut dyn Platform) {}

    /// KILL was driven low.
    fn kill_asserted(&mut self, _platform: &mut dyn Platform) {}

    /// KILL was released.
    fn kill_released(&mut self, _platform: &mut dyn Platform, _reason: ReleaseReason) {}

    /// Advance any running pattern to the current clock value.
    fn tick(&mut self, _platform: &mut dyn Platform) {}

    /// Stop any running pattern and leave the indication off.
    fn halt(&mut self, _platform: &mut dyn Platform) {}
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn init(&mut self, platform: &mut dyn Platform) {
        (**self).init(platform);
    }

    fn reset_asserted(&mut self, platform: &mut dyn Platform) {
        (**self).reset_asserted(platform);
    }

    fn reset_deasserted(&mut self, platform: &mut dyn Platform) {
        (**self).reset_deasserted(platform);
    }

    fn kill_asserted(&mut self, platform: &mut dyn Platform) {
        (**self).kill_asserted(platform);
    }

    fn kill_released(&mut self, platform: &mut dyn Platform, reason: ReleaseReason) {
        (**self).kill_released(platform, reason);
    }

    fn tick(&mut self, platform: &mut dyn Platform) {
        (**self).tick(platform);
    }

    fn halt(&mut self, platform: &mut dyn Platform) {
        (**self).halt(platform);
    }
}

/// Indicator that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIndicator;

impl Indicator for NullIndicator {}

/// Blink timing in clock milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    /// Number of pulses.
    pub count: u8,
    /// LED on time per pulse.
    pub on_ms: u32,
    /// LED off time between pulses.
    pub off_ms: u32,
}

impl BlinkPattern {
    /// Time from the first pulse going on to the last pulse going off.
    #[must_use]
    pub fn duration_ms(&self) -> u32 {
        let period = self.on_ms.saturating_add(self.off_ms);
        period
            .saturating_mul(u32::from(self.count))
            .saturating_sub(self.off_ms)
    }

    /// LED state `elapsed` milliseconds into the pattern, `None` once finished.
    #[must_use]
    pub fn level_at(&self, elapsed: u32) -> Option<bool> {
        if elapsed >= self.duration_ms() {
            return None;
        }
        let period = self.on_ms.saturating_add(self.off_ms);
        Some(elapsed % period < self.on_ms)
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveBlink {
    pattern: BlinkPattern,
    started: Millis,
}

/// On-board LED indicator.
#[derive(Debug, Clone)]
pub struct LedIndicator {
    pin: Pin,
    active_high: bool,
    startup: BlinkPattern,
    powerdown: BlinkPattern,
    timeout_warning: BlinkPattern,
    active: Option<ActiveBlink>,
    lit: bool,
}

impl LedIndicator {
    /// Build an indicator for `pin` from the indication config.
    ///
    /// # Errors
    ///
    /// Returns an error if a blink duration is out of clock range.
    pub fn from_config(pin: Pin, config: &IndicationConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            pin,
            active_high: config.led_active_high,
            startup: BlinkPattern {
                count: config.startup_blink_count,
                on_ms: to_clock_ms("startup_blink_on", config.startup_blink_on)?,
                off_ms: to_clock_ms("startup_blink_off", config.startup_blink_off)?,
            },
            powerdown: BlinkPattern {
                count: 1,
                on_ms: to_clock_ms("powerdown_blink_on", config.powerdown_blink_on)?,
                off_ms: 0,
            },
            timeout_warning: BlinkPattern {
                count: config.timeout_warning_blinks,
                on_ms: to_clock_ms("timeout_warning_on", config.timeout_warning_on)?,
                off_ms: to_clock_ms("timeout_warning_off", config.timeout_warning_off)?,
            },
            active: None,
            lit: false,
        })
    }

    /// The LED pin.
    #[must_use]
    pub fn pin(&self) -> Pin {
        self.pin
    }

    /// Whether a pattern is still running.
    #[must_use]
    pub fn is_blinking(&self) -> bool {
        self.active.is_some()
    }

    fn drive(&mut self, platform: &mut dyn Platform, on: bool) {
        platform.write_level(self.pin, on == self.active_high);
        self.lit = on;
    }

    fn set(&mut self, platform: &mut dyn Platform, on: bool) {
        if on != self.lit {
            self.drive(platform, on);
        }
    }

    /// Start `pattern` now, replacing whatever was running.
    fn start(&mut self, platform: &mut dyn Platform, pattern: BlinkPattern) {
        self.active = Some(ActiveBlink {
            pattern,
            started: platform.now(),
        });
        self.advance(platform);
    }

    fn advance(&mut self, platform: &mut dyn Platform) {
        let Some(blink) = self.active else {
            return;
        };
        let elapsed = platform.now().elapsed_since(blink.started);
        match blink.pattern.level_at(elapsed) {
            Some(on) => self.set(platform, on),
            None => {
                self.active = None;
                self.set(platform, false);
            }
        }
    }
}

impl Indicator for LedIndicator {
    fn init(&mut self, platform: &mut dyn Platform) {
        platform.set_pin_mode(self.pin, PinMode::Output);
        self.active = None;
        self.drive(platform, false);
    }

    fn reset_asserted(&mut self, platform: &mut dyn Platform) {
        debug!(pin = %self.pin, count = self.startup.count, "Power-on blink");
        self.start(platform, self.startup);
    }

    fn reset_deasserted(&mut self, platform: &mut dyn Platform) {
        debug!(pin = %self.pin, "Power-off blink");
        self.start(platform, self.powerdown);
    }

    fn kill_released(&mut self, platform: &mut dyn Platform, reason: ReleaseReason) {
        if reason.is_timeout() {
            debug!(pin = %self.pin, "Kill timeout warning blink");
            self.start(platform, self.timeout_warning);
        }
    }

    fn tick(&mut self, platform: &mut dyn Platform) {
        self.advance(platform);
    }

    fn halt(&mut self, platform: &mut dyn Platform) {
        self.active = None;
        self.set(platform, false);
    }
}
