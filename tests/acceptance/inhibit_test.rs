//! Startup inhibit acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - With the startup-blink profile, INT activity during power-up never kills
//! - The window closes at its maximum duration or when RESET drops
//! - Each RESET assertion re-arms the window
//! - The basic profile never suppresses a kill

use super::common::*;
use tps_common::config::Profile;
use tps_common::time::Millis;
use tps_runtime::platform::Platform;

#[test]
fn test_boot_inhibit_then_kill() {
    let mut sim = board(0, true);
    int_at(&mut sim, 700);
    int_at(&mut sim, 1100);
    let mut supervisor = boot(sim, &config(Profile::StartupBlink, 10, 1000));

    // Power-on blink started without advancing the clock
    assert_eq!(supervisor.platform().now(), Millis(0));
    assert!(supervisor.inhibit_active());

    let reports = run_until(&mut supervisor, 1200);

    let events: Vec<_> = reports.iter().filter_map(|r| r.event).collect();
    assert_eq!(events.len(), 2);
    assert!(!events[0].kill);
    assert!(events[1].kill);
    assert_eq!(assertions(&reports), vec![Millis(1100)]);

    let cleared: Vec<_> = reports.iter().filter(|r| r.inhibit_cleared).map(|r| r.at).collect();
    assert_eq!(cleared, vec![Millis(1000)]);
    // Three startup pulses
    assert_eq!(led_pulses_since(&supervisor, Millis(0)), 3);
}

#[test]
fn test_edge_during_boot_blink_is_inhibited() {
    let mut sim = board(0, true);
    int_at(&mut sim, 300);
    let mut supervisor = boot(sim, &config(Profile::StartupBlink, 10, 1000));

    let reports = run_until(&mut supervisor, 700);

    let drained: Vec<_> = reports.iter().filter(|r| r.event.is_some()).collect();
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].at, Millis(300));
    assert!(!drained[0].event.unwrap().kill);
    assert!(assertions(&reports).is_empty());
    // Blink carried on past the drain
    assert_eq!(led_pulses_since(&supervisor, Millis(0)), 3);
}

#[test]
fn test_reset_drop_closes_window_and_rise_rearms() {
    let mut sim = board(0, true);
    reset_at(&mut sim, 800, false);
    reset_at(&mut sim, 1400, true);
    int_at(&mut sim, 2100);
    int_at(&mut sim, 2500);
    let mut supervisor = boot(sim, &config(Profile::StartupBlink, 10, 1000));

    let reports = run_until(&mut supervisor, 2600);

    let cleared: Vec<_> = reports.iter().filter(|r| r.inhibit_cleared).collect();
    // Closed by RESET low, then by expiry
    assert_eq!(cleared.len(), 2);
    assert_eq!(cleared[0].at, Millis(800));
    assert_eq!(cleared[1].at, Millis(2400));

    let events: Vec<_> = reports.iter().filter_map(|r| r.event).collect();
    assert_eq!(events.len(), 2);
    assert!(!events[0].kill);
    assert!(events[1].kill);
    assert_eq!(supervisor.stats().inhibits_armed, 2);
    assert_eq!(assertions(&reports), vec![Millis(2500)]);
}

#[test]
fn test_basic_profile_kills_during_power_up() {
    let mut sim = board(0, true);
    int_at(&mut sim, 700);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    assert!(!supervisor.inhibit_active());
    let reports = run_until(&mut supervisor, 800);
    assert_eq!(assertions(&reports), vec![Millis(700)]);
    assert!(supervisor.platform().line_history(LED).is_empty());
}
