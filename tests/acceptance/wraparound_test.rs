//! Clock wraparound acceptance tests.
//!
//! The millisecond counter wraps every ~49.7 days. Every interval the
//! supervisor measures must come out the same when it straddles the wrap.

use super::common::*;
use tps_common::config::Profile;
use tps_common::state::ReleaseReason;
use tps_common::time::Millis;

const NEAR_WRAP: u32 = u32::MAX - 50;

#[test]
fn test_kill_and_release_across_wrap() {
    let mut sim = board(NEAR_WRAP, true);
    int_at(&mut sim, 90);
    reset_at(&mut sim, 95, false);
    let mut supervisor = boot(sim, &config(Profile::Basic, 80, 1000));

    let reports = run_until(&mut supervisor, 200);

    assert_eq!(assertions(&reports), vec![Millis(39)]);
    let released = releases(&reports);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].reason, ReleaseReason::ResetDeasserted);
    assert_eq!(released[0].asserted_at, Millis(39));
    assert_eq!(released[0].held_ms, 10);
}

#[test]
fn test_short_reset_across_wrap_does_not_kill() {
    let mut sim = board(NEAR_WRAP, false);
    // RESET rises just before the wrap, INT lands just after it
    reset_at(&mut sim, 49, true);
    int_at(&mut sim, 70);
    let mut supervisor = boot(sim, &config(Profile::Basic, 80, 1000));

    let reports = run_until(&mut supervisor, 200);

    assert!(assertions(&reports).is_empty());
    assert_eq!(supervisor.history().high_since(), Some(Millis(u32::MAX - 1)));
}

#[test]
fn test_timeout_across_wrap() {
    let mut sim = board(u32::MAX - 500, true);
    int_at(&mut sim, 100);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    let reports = run_until(&mut supervisor, 1200);

    let released = releases(&reports);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].reason, ReleaseReason::Timeout);
    assert_eq!(released[0].held_ms, 1000);
    let release_report = reports.iter().find(|r| r.release.is_some()).unwrap();
    assert_eq!(release_report.at, Millis(599));
}

#[test]
fn test_inhibit_expires_across_wrap() {
    let mut sim = board(u32::MAX - 100, true);
    int_at(&mut sim, 700);
    int_at(&mut sim, 1100);
    let mut supervisor = boot(sim, &config(Profile::StartupBlink, 10, 1000));

    let reports = run_until(&mut supervisor, 1200);

    let cleared = reports.iter().find(|r| r.inhibit_cleared).unwrap();
    assert_eq!(cleared.at, Millis(899));
    assert_eq!(assertions(&reports), vec![Millis(999)]);
}
