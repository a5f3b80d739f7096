//! INT debounce acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - Edges within the debounce window of an accepted edge produce no decision
//! - An edge exactly one window later is accepted
//! - The very first edge after boot is accepted

use super::common::*;
use tps_common::config::Profile;
use tps_common::time::Millis;

#[test]
fn test_bounce_within_window_dropped() {
    let mut sim = board(0, true);
    int_at(&mut sim, 100);
    int_at(&mut sim, 105);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    let reports = run_until(&mut supervisor, 200);

    let events: Vec<_> = reports.iter().filter_map(|r| r.event).collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].fired_at, Millis(100));
    assert_eq!(supervisor.stats().kills_ignored, 0);
}

#[test]
fn test_edge_one_window_later_accepted() {
    let mut sim = board(0, true);
    int_at(&mut sim, 100);
    int_at(&mut sim, 110);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    run_until(&mut supervisor, 200);

    assert_eq!(supervisor.stats().events_drained, 2);
    assert_eq!(supervisor.stats().kills_asserted, 1);
    assert_eq!(supervisor.stats().kills_ignored, 1);
}

#[test]
fn test_bounce_train() {
    let mut sim = board(0, true);
    for at in (100..120).step_by(2) {
        int_at(&mut sim, at);
    }
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    let reports = run_until(&mut supervisor, 200);

    let fired: Vec<_> = reports
        .iter()
        .filter_map(|r| r.event.map(|e| e.fired_at))
        .collect();
    assert_eq!(fired, vec![Millis(100), Millis(110)]);
}

#[test]
fn test_first_edge_right_after_boot_accepted() {
    let mut sim = board(0, false);
    int_at(&mut sim, 1);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    run_until(&mut supervisor, 20);

    // Accepted and decided, though RESET low means no kill
    assert_eq!(supervisor.stats().events_drained, 1);
    assert_eq!(supervisor.stats().kill_decisions, 0);
}
