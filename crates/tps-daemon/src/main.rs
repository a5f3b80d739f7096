//! TPS3424 supervisor daemon entry point.
//!
//! Runs the supervisor against the simulated board, optionally driven by a
//! scenario file, with signal handling and a run summary.

mod diagnostics;
mod scenario;
mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;
use tps_common::config::{Profile, SupervisorConfig};
use tps_runtime::indication::{Indicator, LedIndicator, NullIndicator};
use tps_runtime::platform::{Pin, Platform};
use tps_runtime::supervisor::Supervisor;
use tracing::{info, warn};

use crate::diagnostics::{RunSummary, StopReason};
use crate::scenario::Scenario;
use crate::signals::ShutdownSignal;

/// Iterations between periodic status lines.
const STATUS_EVERY: u64 = 10_000;

/// Supervisor daemon command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "tps-daemon",
    about = "TPS3424 KILL supervisor running on a simulated board",
    version,
    long_about = None
)]
struct Args {
    /// Path to a supervisor configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scenario file describing RESET and INT activity.
    #[arg(long, short = 's', value_name = "FILE")]
    scenario: Option<PathBuf>,

    /// Override the configured profile (basic, startup_blink).
    #[arg(long, short = 'p')]
    profile: Option<Profile>,

    /// Maximum poll iterations (0 = until the scenario ends or a signal).
    #[arg(long, default_value = "0")]
    max_iterations: u64,

    /// Pace the simulated clock in real time.
    #[arg(long)]
    realtime: bool,

    /// Print a JSON run summary on exit.
    #[arg(long)]
    summary_json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

/// Run parameters that are not part of the supervisor configuration.
#[derive(Debug, Clone, Copy, Default)]
struct RunOptions {
    max_iterations: u64,
    realtime: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting TPS supervisor daemon");

    let mut config = load_config(&args)?;
    if let Some(profile) = args.profile {
        config.profile = profile;
    }
    config.validate().context("Invalid configuration")?;
    info!(profile = %config.profile, ?config.timing, "Configuration loaded");

    let scenario = args
        .scenario
        .as_deref()
        .map(Scenario::from_file)
        .transpose()?;

    let signal = ShutdownSignal::install().context("Failed to set up signal handlers")?;

    let options = RunOptions {
        max_iterations: args.max_iterations,
        realtime: args.realtime,
    };
    let summary = run(&config, scenario.as_ref(), &signal, options)?;

    if args.summary_json {
        println!("{}", summary.to_json().context("Failed to encode run summary")?);
    }
    Ok(())
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("tps_daemon={level},tps_runtime={level},tps_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `TPS_CONFIG_PATH` environment variable
/// 3. `/etc/tps-supervisor/config.toml` (system path)
/// 4. `config/default.toml` (local development)
/// 5. Built-in defaults
fn load_config(args: &Args) -> Result<SupervisorConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return SupervisorConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("TPS_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from TPS_CONFIG_PATH");
            return SupervisorConfig::from_file(&config_path)
                .with_context(|| format!("Failed to load config from TPS_CONFIG_PATH={env_path:?}"));
        }
        warn!(
            path = %env_path,
            "TPS_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    for candidate in ["/etc/tps-supervisor/config.toml", "config/default.toml"] {
        let path = PathBuf::from(candidate);
        if path.exists() {
            info!(?path, "Loading config");
            return SupervisorConfig::from_file(&path)
                .with_context(|| format!("Failed to load config from {path:?}"));
        }
    }

    info!("No config file found, using built-in defaults");
    Ok(SupervisorConfig::default())
}

fn build_indicator(config: &SupervisorConfig) -> Result<Box<dyn Indicator>> {
    if config.profile.uses_led() {
        let led = LedIndicator::from_config(Pin(config.pins.led), &config.indication)
            .context("Invalid indication settings")?;
        Ok(Box::new(led))
    } else {
        Ok(Box::new(NullIndicator))
    }
}

/// Run the supervisor until a stop condition is met, then release KILL.
fn run(
    config: &SupervisorConfig,
    scenario: Option<&Scenario>,
    signal: &ShutdownSignal,
    options: RunOptions,
) -> Result<RunSummary> {
    // Without a script nothing ever happens on the board, so keep host time
    let paced = options.realtime || scenario.is_none();
    let default_scenario = Scenario::default();
    let script = scenario.unwrap_or(&default_scenario);
    let platform = script.build_platform(&config.pins, paced);
    let clock_start = platform.now();

    let indicator = build_indicator(config)?;
    let wall_start = Instant::now();
    let mut supervisor =
        Supervisor::start(platform, indicator, config).context("Failed to start supervisor")?;

    let end_ms = script.end_ms();
    let mut stop_reason = StopReason::Signal;
    supervisor.run_until(|sup, _| {
        let iterations = sup.stats().iterations;
        if iterations % STATUS_EVERY == 0 {
            info!(
                iterations,
                kill_state = %sup.kill_state(),
                kills = sup.stats().kills_asserted,
                "Periodic status"
            );
        }
        if signal.requested() {
            if let Some(kind) = signal.received() {
                info!(signal = %kind, "Stop signal received");
            }
            stop_reason = StopReason::Signal;
            return true;
        }
        if options.max_iterations > 0 && iterations >= options.max_iterations {
            info!(iterations, "Maximum iteration count reached");
            stop_reason = StopReason::MaxIterations;
            return true;
        }
        let sim = sup.platform();
        if scenario.is_some()
            && sim.pending_stimuli() == 0
            && !sup.event_pending()
            && !sup.kill_state().is_asserted()
            && sim.elapsed() >= end_ms
        {
            stop_reason = StopReason::ScenarioComplete;
            return true;
        }
        false
    });

    info!("Shutting down...");
    let kill_forced_idle = supervisor.shutdown().is_some();

    let (platform, _, stats) = supervisor.into_parts();
    let summary = RunSummary {
        version: env!("CARGO_PKG_VERSION"),
        profile: config.profile.to_string(),
        stop_reason,
        clock_start: clock_start.as_u32(),
        clock_end: platform.now().as_u32(),
        virtual_elapsed_ms: platform.elapsed(),
        wall_time_ms: RunSummary::wall_ms(wall_start.elapsed()),
        kill_forced_idle,
        signals: signal.signal_count(),
        stats,
    };

    info!(
        stop_reason = %summary.stop_reason,
        iterations = summary.stats.iterations,
        kills = summary.stats.kills_asserted,
        clean_releases = summary.stats.clean_releases,
        timeout_releases = summary.stats.timeout_releases,
        longest_hold_ms = summary.stats.longest_hold_ms,
        "Daemon shutdown complete"
    );
    Ok(summary)
}
