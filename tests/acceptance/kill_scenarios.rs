//! Kill decision and release acceptance tests.
//!
//! # Acceptance Criteria
//!
//! - An INT edge after RESET has been high long enough asserts KILL within
//!   one poll iteration
//! - An INT edge after a short RESET assertion never asserts KILL
//! - KILL is released once RESET is low and the minimum hold is met, or at
//!   the timeout, whichever comes first
//! - Kill requests while asserted neither re-stamp nor extend the hold

use super::common::*;
use tps_common::config::Profile;
use tps_common::state::{KillState, ReleaseReason};
use tps_common::time::Millis;

#[test]
fn test_kill_released_after_reset_drops() {
    let mut sim = board(0, true);
    int_at(&mut sim, 90);
    reset_at(&mut sim, 95, false);
    let mut supervisor = boot(sim, &config(Profile::Basic, 80, 1000));

    let reports = run_until(&mut supervisor, 200);

    assert_eq!(assertions(&reports), vec![Millis(90)]);
    let released = releases(&reports);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].reason, ReleaseReason::ResetDeasserted);
    assert_eq!(released[0].asserted_at, Millis(90));
    assert_eq!(released[0].held_ms, 10);

    // KILL low from 90 to 100, floating high otherwise
    assert_eq!(
        supervisor.platform().line_history(KILL),
        &[(Millis(0), true), (Millis(90), false), (Millis(100), true)]
    );
}

#[test]
fn test_short_reset_assertion_does_not_kill() {
    let mut sim = board(0, true);
    int_at(&mut sim, 50);
    let mut supervisor = boot(sim, &config(Profile::Basic, 80, 1000));

    let reports = run_until(&mut supervisor, 200);

    assert!(assertions(&reports).is_empty());
    let event = reports.iter().find_map(|r| r.event).unwrap();
    assert!(!event.kill);
    assert_eq!(event.fired_at, Millis(50));
    assert_eq!(
        supervisor.platform().line_history(KILL),
        &[(Millis(0), true)]
    );
}

#[test]
fn test_reset_low_at_int_does_not_kill() {
    let mut sim = board(0, false);
    int_at(&mut sim, 500);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    let reports = run_until(&mut supervisor, 600);
    assert!(assertions(&reports).is_empty());
    assert_eq!(supervisor.stats().events_drained, 1);
}

#[test]
fn test_timeout_release_with_warning() {
    let mut sim = board(0, false);
    reset_at(&mut sim, 10, true);
    int_at(&mut sim, 1100);
    let mut supervisor = boot(sim, &config(Profile::StartupBlink, 80, 3000));

    let reports = run_until(&mut supervisor, 5000);

    assert_eq!(assertions(&reports), vec![Millis(1100)]);
    let released = releases(&reports);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].reason, ReleaseReason::Timeout);
    assert_eq!(released[0].held_ms, 3000);

    let release_report = reports.iter().find(|r| r.release.is_some()).unwrap();
    assert_eq!(release_report.at, Millis(4100));
    assert_eq!(led_pulses_since(&supervisor, Millis(4100)), 5);
    assert_eq!(supervisor.stats().timeout_releases, 1);
    assert_eq!(supervisor.kill_state(), KillState::Idle);
}

#[test]
fn test_reset_drop_near_timeout_releases_at_once() {
    let mut sim = board(0, true);
    int_at(&mut sim, 1100);
    reset_at(&mut sim, 2050, false);
    let mut supervisor = boot(sim, &config(Profile::StartupBlink, 10, 1000));

    let reports = run_until(&mut supervisor, 2700);

    assert_eq!(assertions(&reports), vec![Millis(1100)]);
    let released = releases(&reports);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].reason, ReleaseReason::ResetDeasserted);
    assert_eq!(released[0].held_ms, 950);
    assert!(released[0].held_ms <= 1000);

    // KILL floats in the same iteration the power-off pulse starts
    let release_report = reports.iter().find(|r| r.release.is_some()).unwrap();
    assert_eq!(release_report.at, Millis(2050));
    assert_eq!(
        supervisor.platform().line_history(KILL),
        &[(Millis(0), true), (Millis(1100), false), (Millis(2050), true)]
    );
    assert_eq!(led_pulses_since(&supervisor, Millis(2050)), 1);
}

#[test]
fn test_release_waits_for_minimum_hold() {
    let mut sim = board(0, true);
    int_at(&mut sim, 100);
    // RESET already dropping as KILL goes low
    reset_at(&mut sim, 101, false);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    let reports = run_until(&mut supervisor, 300);

    let released = releases(&reports);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].held_ms, 10);
    let release_report = reports.iter().find(|r| r.release.is_some()).unwrap();
    assert_eq!(release_report.at, Millis(110));
}

#[test]
fn test_repeated_kill_does_not_extend_hold() {
    let mut sim = board(0, true);
    int_at(&mut sim, 100);
    int_at(&mut sim, 500);
    int_at(&mut sim, 900);
    let mut supervisor = boot(sim, &config(Profile::Basic, 10, 1000));

    let reports = run_until(&mut supervisor, 1500);

    assert_eq!(assertions(&reports), vec![Millis(100)]);
    let released = releases(&reports);
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].asserted_at, Millis(100));
    assert_eq!(released[0].reason, ReleaseReason::Timeout);
    assert_eq!(supervisor.stats().kills_ignored, 2);
}

#[test]
fn test_kill_again_after_release() {
    let mut sim = board(0, true);
    int_at(&mut sim, 100);
    reset_at(&mut sim, 150, false);
    reset_at(&mut sim, 300, true);
    int_at(&mut sim, 400);
    let mut supervisor = boot(sim, &config(Profile::Basic, 50, 1000));

    let reports = run_until(&mut supervisor, 500);

    assert_eq!(assertions(&reports), vec![Millis(100), Millis(400)]);
    assert_eq!(supervisor.asserted_at(), Some(Millis(400)));
    assert_eq!(supervisor.stats().clean_releases, 1);
}

#[test]
fn test_random_activity_respects_kill_rules() {
    const MIN_HIGH: u32 = 10;
    const MIN_HOLD: u32 = 10;
    const TIMEOUT: u32 = 1000;

    let runs = (1..=6).flat_map(|seed| [(seed, Profile::Basic), (seed, Profile::StartupBlink)]);
    for (seed, profile) in runs {
        let mut rng = Lcg::new(seed);
        let mut sim = board(0, false);
        let mut t = 0u64;
        let mut level = false;
        for _ in 0..120 {
            t += 1 + rng.below(150);
            // RESET on even milliseconds, INT on odd ones
            if rng.below(3) == 0 {
                level = !level;
                reset_at(&mut sim, t * 2, level);
            } else {
                int_at(&mut sim, t * 2 + 1);
            }
        }
        let mut supervisor = boot(sim, &config(profile, u64::from(MIN_HIGH), u64::from(TIMEOUT)));

        let reports = run_until(&mut supervisor, t * 2 + 3000);

        for release in releases(&reports) {
            assert!(release.held_ms <= TIMEOUT, "seed {seed} {profile}: {release:?}");
            match release.reason {
                ReleaseReason::Timeout => assert_eq!(release.held_ms, TIMEOUT),
                ReleaseReason::ResetDeasserted => assert!(release.held_ms >= MIN_HOLD),
            }
        }

        let reset_history = supervisor.platform().line_history(RESET);
        for report in reports.iter().filter(|r| r.asserted) {
            let fired_at = report.event.unwrap().fired_at;
            let &(since, high) = reset_history
                .iter()
                .rev()
                .find(|&&(at, _)| at.as_u32() <= fired_at.as_u32())
                .unwrap();
            assert!(high, "seed {seed}: kill with RESET low at {fired_at}");
            assert!(
                fired_at.elapsed_since(since) >= MIN_HIGH,
                "seed {seed}: kill after short RESET at {fired_at}"
            );
        }

        let stats = supervisor.stats();
        assert_eq!(stats.kill_decisions, stats.kills_asserted + stats.kills_ignored);
        assert_eq!(stats.kills_asserted, stats.releases());
        assert_eq!(supervisor.kill_state(), KillState::Idle);
    }
}
