//! Time-table feeding, clock availability and the daily roll-over.

use petfeeder::app::commands::AppCommand;
use petfeeder::app::events::AppEvent;
use petfeeder::config::FeederConfig;
use petfeeder::feeding::{Origin, Rejection};
use petfeeder::fsm::StateId;

use crate::mock_hw::{wall, Rig};

fn accepted(rig: &Rig, origin: Origin) -> usize {
    rig.sink
        .count(|e| matches!(e, AppEvent::DispenseAccepted(o) if *o == origin))
}

fn rejected(rig: &Rig, origin: Origin) -> usize {
    rig.sink
        .count(|e| matches!(e, AppEvent::DispenseRejected { origin: o, .. } if *o == origin))
}

#[test]
fn morning_feed_after_previous_evening() {
    let mut rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 9, 22, 0, 0)));
    assert_eq!(rig.app.state(), StateId::Dispensing);
    rig.finish_dispense();
    assert_eq!(rig.app.counters().daily_grams, 25);

    // Overnight: the daily total resets, nothing is due yet.
    rig.clock.set(wall(2024, 3, 10, 7, 58, 0));
    rig.jump(10 * 3_600_000);
    assert_eq!(rig.app.counters().daily_grams, 0);
    assert_eq!(rig.app.counters().total_grams, 25);
    assert_eq!(rig.app.state(), StateId::Idle);

    rig.clock.set(wall(2024, 3, 10, 8, 0, 0));
    rig.run_for(1_000);
    assert_eq!(rig.app.state(), StateId::Dispensing);
    assert_eq!(rig.app.scheduler().last_auto_feed(), Some(wall(2024, 3, 10, 8, 0, 0)));

    rig.finish_dispense();
    assert_eq!(accepted(&rig, Origin::Scheduled), 2);
    assert_eq!(rig.app.counters().daily_grams, 25);
    assert_eq!(rig.app.counters().total_grams, 50);
}

#[test]
fn hour_guard_blocks_neighbouring_minute() {
    let mut rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 10, 7, 59, 0)));
    rig.finish_dispense();
    assert_eq!(accepted(&rig, Origin::Scheduled), 1);

    for minute in [0, 1] {
        rig.clock.set(wall(2024, 3, 10, 8, minute, 0));
        rig.run_for(2_000);
    }
    assert_eq!(accepted(&rig, Origin::Scheduled), 1);
    // Declined by the scheduler itself, not by eligibility.
    assert_eq!(rejected(&rig, Origin::Scheduled), 0);
}

#[test]
fn refused_attempt_is_retried_next_minute_only() {
    let mut rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 10, 11, 0, 0)));
    rig.hw.weight = Ok(250.0);
    rig.run_for(600);

    rig.clock.set(wall(2024, 3, 10, 12, 0, 0));
    rig.run_for(2_000);
    assert_eq!(rejected(&rig, Origin::Scheduled), 1);
    assert!(rig.sink.events.contains(&AppEvent::DispenseRejected {
        origin: Origin::Scheduled,
        reason: Rejection::BowlFull,
    }));

    // Bowl eaten down, but the minute already had its attempt.
    rig.hw.weight = Ok(50.0);
    rig.run_for(1_000);
    assert_eq!(accepted(&rig, Origin::Scheduled), 0);
    assert_eq!(rejected(&rig, Origin::Scheduled), 1);

    rig.clock.set(wall(2024, 3, 10, 12, 1, 0));
    rig.run_for(1_000);
    assert_eq!(accepted(&rig, Origin::Scheduled), 1);
    assert_eq!(rig.app.scheduler().last_auto_feed(), Some(wall(2024, 3, 10, 12, 1, 0)));
}

#[test]
fn disabled_auto_feeding_skips_table() {
    let mut rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 10, 11, 0, 0)));
    assert_eq!(rig.command(AppCommand::SetAutoFeeding(false)), Ok(()));
    assert_eq!(rig.sink.count(|e| *e == AppEvent::AutoFeedingChanged(false)), 1);

    rig.clock.set(wall(2024, 3, 10, 12, 0, 0));
    rig.run_for(2_000);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(accepted(&rig, Origin::Scheduled), 0);

    // Manual feeding is unaffected.
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Ok(()));
}

#[test]
fn lost_clock_pauses_schedule_until_it_returns() {
    let mut rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 10, 11, 0, 0)));
    assert!(rig.app.system_state().rtc_ready);
    assert!(rig.app.next_feed().is_some());

    rig.clock.fail();
    rig.run_for(1_000);
    assert!(!rig.app.system_state().rtc_ready);
    assert!(rig.app.next_feed().is_none());
    assert_eq!(rig.sink.count(|e| *e == AppEvent::ClockAvailability(false)), 1);
    assert!(rig.app.telemetry_snapshot().timestamp.is_none());

    rig.clock.set(wall(2024, 3, 10, 12, 0, 0));
    rig.run_for(1_000);
    assert!(rig.app.system_state().rtc_ready);
    assert_eq!(rig.app.state(), StateId::Dispensing);
}

#[test]
fn no_clock_means_no_scheduled_feeds() {
    let mut rig = Rig::with_defaults();
    rig.run_for(5_000);
    assert!(!rig.app.system_state().rtc_ready);
    assert_eq!(accepted(&rig, Origin::Scheduled), 0);
    let frame = rig.app.display_frame();
    assert_eq!(frame.line1.as_str(), "Pet Feeder Ready");
    assert!(frame.line2.starts_with("Bowl:"));
}

#[test]
fn next_feed_rolls_to_tomorrow_after_last_entry() {
    let rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 10, 11, 0, 0)));
    let next = rig.app.next_feed().unwrap();
    assert_eq!((next.at.hour, next.at.minute, next.tomorrow), (12, 0, false));

    let rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 31, 22, 30, 0)));
    let next = rig.app.next_feed().unwrap();
    assert!(next.tomorrow);
    assert_eq!(next.at, wall(2024, 4, 1, 8, 0, 0));
}

#[test]
fn midnight_resets_daily_total_only() {
    let mut rig = Rig::new(FeederConfig::default(), Some(wall(2024, 3, 10, 23, 58, 0)));
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.finish_dispense();
    assert_eq!(rig.app.counters().daily_grams, 25);

    rig.clock.set(wall(2024, 3, 11, 0, 0, 5));
    rig.run_for(1_000);
    assert_eq!(rig.app.counters().daily_grams, 0);
    assert_eq!(rig.app.counters().total_grams, 25);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DailyReset(_))), 1);

    // Same day again: no second reset.
    rig.run_for(3_000);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DailyReset(_))), 1);
}

#[test]
fn press_just_after_midnight_sees_new_day() {
    let config = FeederConfig {
        max_daily_grams: 25,
        ..FeederConfig::default()
    };
    let mut rig = Rig::new(config, Some(wall(2024, 3, 10, 23, 59, 50)));
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.finish_dispense();
    rig.jump(6 * 60_000);
    assert_eq!(
        rig.command(AppCommand::Dispense(Origin::Manual)),
        Err(Rejection::DailyLimitReached)
    );

    // Day changes between two clock polls; the press must not wait for the next one.
    rig.clock.set(wall(2024, 3, 11, 0, 0, 0));
    rig.now_ms += 5;
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Ok(()));
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::DailyReset(_))), 1);
    assert_eq!(rig.app.counters().daily_grams, 0);
    assert_eq!(rig.app.counters().total_grams, 25);

    rig.finish_dispense();
    assert_eq!(rig.app.counters().daily_grams, 25);
}

#[test]
fn month_end_rollover() {
    let mut rig = Rig::new(FeederConfig::default(), Some(wall(2024, 2, 29, 23, 59, 50)));
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.finish_dispense();

    rig.clock.advance_secs(20);
    rig.run_for(1_000);
    assert_eq!(rig.app.counters().daily_grams, 0);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::DailyReset(wall(2024, 3, 1, 0, 0, 10))), 1);
}
