//! Configuration structures for the supervisor.
//!
//! Supports TOML deserialization with defaults matching the reference
//! firmware constants, so an empty file yields a working configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Longest duration the wrapping millisecond clock can measure unambiguously.
pub const MAX_MEASURABLE_MS: u64 = 1 << 31;

/// Top-level supervisor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Behavioural profile.
    pub profile: Profile,

    /// Kill timing constants.
    pub timing: TimingConfig,

    /// Startup inhibit window (startup-blink profile only).
    pub inhibit: InhibitConfig,

    /// LED indication timing.
    pub indication: IndicationConfig,

    /// Pin assignments.
    pub pins: PinConfig,
}

/// Behavioural profile of the supervisor.
///
/// The two reference firmware variants differ in whether RESET rising edges
/// arm a kill-inhibit window and blink the LED. They are kept as distinct
/// profiles rather than merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// No startup inhibit, no LED indication.
    Basic,
    /// Startup inhibit on boot and on each RESET rising edge, LED blink indication.
    #[default]
    StartupBlink,
}

impl Profile {
    /// Whether RESET rising edges arm the kill-inhibit window.
    #[must_use]
    pub fn uses_startup_inhibit(self) -> bool {
        matches!(self, Profile::StartupBlink)
    }

    /// Whether the LED indicator should be driven.
    #[must_use]
    pub fn uses_led(self) -> bool {
        matches!(self, Profile::StartupBlink)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Profile::Basic => write!(f, "basic"),
            Profile::StartupBlink => write!(f, "startup_blink"),
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Profile::Basic),
            "startup_blink" | "startup-blink" => Ok(Profile::StartupBlink),
            other => Err(ConfigError::Invalid(format!("unknown profile '{other}'"))),
        }
    }
}

/// Kill timing constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Minimum time KILL stays asserted before a clean release is allowed.
    #[serde(with = "humantime_serde")]
    pub kill_min_hold: Duration,

    /// Absolute ceiling on how long KILL may stay asserted.
    #[serde(with = "humantime_serde")]
    pub kill_timeout: Duration,

    /// INT edges closer than this to the last accepted edge are dropped.
    #[serde(with = "humantime_serde")]
    pub int_debounce: Duration,

    /// RESET must have been high at least this long for an INT edge to kill.
    #[serde(with = "humantime_serde")]
    pub reset_high_min_before_int: Duration,

    /// Per-iteration yield of the poll loop.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            kill_min_hold: Duration::from_millis(10),
            kill_timeout: Duration::from_millis(1000),
            int_debounce: Duration::from_millis(10),
            reset_high_min_before_int: Duration::from_millis(10),
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Startup inhibit window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InhibitConfig {
    /// Upper bound on the inhibit window if RESET never deasserts.
    #[serde(with = "humantime_serde")]
    pub max_duration: Duration,
}

impl Default for InhibitConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::from_millis(1000),
        }
    }
}

/// LED indication configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicationConfig {
    /// LED lights when its pin is driven high.
    pub led_active_high: bool,

    /// Number of blinks on RESET rising edge.
    pub startup_blink_count: u8,

    /// On time of each startup blink.
    #[serde(with = "humantime_serde")]
    pub startup_blink_on: Duration,

    /// Off time between startup blinks.
    #[serde(with = "humantime_serde")]
    pub startup_blink_off: Duration,

    /// On time of the single power-down pulse on RESET falling edge.
    #[serde(with = "humantime_serde")]
    pub powerdown_blink_on: Duration,

    /// Number of blinks after a timeout release.
    pub timeout_warning_blinks: u8,

    /// On time of each timeout warning blink.
    #[serde(with = "humantime_serde")]
    pub timeout_warning_on: Duration,

    /// Off time between timeout warning blinks.
    #[serde(with = "humantime_serde")]
    pub timeout_warning_off: Duration,
}

impl Default for IndicationConfig {
    fn default() -> Self {
        Self {
            led_active_high: false,
            startup_blink_count: 3,
            startup_blink_on: Duration::from_millis(120),
            startup_blink_off: Duration::from_millis(120),
            powerdown_blink_on: Duration::from_millis(500),
            timeout_warning_blinks: 5,
            timeout_warning_on: Duration::from_millis(40),
            timeout_warning_off: Duration::from_millis(40),
        }
    }
}

/// Pin assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfig {
    /// RESET input from the monitor (active high, push-pull).
    pub reset: u8,
    /// INT input from the monitor (active low, open drain).
    pub int: u8,
    /// KILL output to the monitor (active low).
    pub kill: u8,
    /// Status LED.
    pub led: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            reset: 1,
            int: 2,
            kill: 3,
            led: 21,
        }
    }
}

/// Validated timing constants in clock milliseconds.
///
/// This is what the runtime consumes; building one from a [`SupervisorConfig`]
/// guarantees every interval is measurable with the wrapping clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// See [`TimingConfig::kill_min_hold`].
    pub kill_min_hold_ms: u32,
    /// See [`TimingConfig::kill_timeout`].
    pub kill_timeout_ms: u32,
    /// See [`TimingConfig::int_debounce`].
    pub int_debounce_ms: u32,
    /// See [`TimingConfig::reset_high_min_before_int`].
    pub reset_high_min_ms: u32,
    /// See [`TimingConfig::poll_interval`].
    pub poll_interval_ms: u32,
    /// See [`InhibitConfig::max_duration`].
    pub inhibit_max_ms: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            kill_min_hold_ms: 10,
            kill_timeout_ms: 1000,
            int_debounce_ms: 10,
            reset_high_min_ms: 10,
            poll_interval_ms: 1,
            inhibit_max_ms: 1000,
        }
    }
}

/// Convert a duration to clock milliseconds, rejecting unmeasurable values.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the duration is not below
/// [`MAX_MEASURABLE_MS`].
pub fn to_clock_ms(name: &str, duration: Duration) -> Result<u32, ConfigError> {
    let ms = duration.as_millis();
    if ms >= u128::from(MAX_MEASURABLE_MS) {
        return Err(ConfigError::Invalid(format!(
            "{name} of {} exceeds the measurable clock range",
            humantime::format_duration(duration)
        )));
    }
    u32::try_from(ms).map_err(|_| ConfigError::Invalid(format!("{name} out of range")))
}

impl SupervisorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_toml(&content)?;
        debug!(?path, profile = %config.profile, "Parsed supervisor config");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve_timing()?;

        let pins = [
            self.pins.reset,
            self.pins.int,
            self.pins.kill,
            self.pins.led,
        ];
        let unique: HashSet<u8> = pins.iter().copied().collect();
        if unique.len() != pins.len() {
            return Err(ConfigError::Invalid(format!(
                "pin assignments must be distinct, got {:?}",
                self.pins
            )));
        }

        Ok(())
    }

    /// Derive the validated millisecond timing used by the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if any timing rule is violated.
    pub fn resolve_timing(&self) -> Result<Timing, ConfigError> {
        let t = &self.timing;
        let timing = Timing {
            kill_min_hold_ms: to_clock_ms("kill_min_hold", t.kill_min_hold)?,
            kill_timeout_ms: to_clock_ms("kill_timeout", t.kill_timeout)?,
            int_debounce_ms: to_clock_ms("int_debounce", t.int_debounce)?,
            reset_high_min_ms: to_clock_ms(
                "reset_high_min_before_int",
                t.reset_high_min_before_int,
            )?,
            poll_interval_ms: to_clock_ms("poll_interval", t.poll_interval)?,
            inhibit_max_ms: to_clock_ms("inhibit.max_duration", self.inhibit.max_duration)?,
        };

        if timing.kill_timeout_ms == 0 {
            return Err(ConfigError::Invalid("kill_timeout must be non-zero".into()));
        }
        if timing.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval must be at least 1ms".into(),
            ));
        }
        if timing.kill_min_hold_ms > timing.kill_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "kill_min_hold ({}ms) must not exceed kill_timeout ({}ms)",
                timing.kill_min_hold_ms, timing.kill_timeout_ms
            )));
        }

        Ok(timing)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value parsed but violates a supervisor constraint.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Serde helper module for `Duration` using humantime format.
pub mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a duration as a humantime string such as `"10ms"`.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    /// Deserialize a duration from a humantime string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
