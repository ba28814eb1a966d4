//! Dispensing sequence and arbitration through the full AppService.

use petfeeder::app::commands::AppCommand;
use petfeeder::app::events::AppEvent;
use petfeeder::app::feedback;
use petfeeder::feeding::{Origin, Rejection};
use petfeeder::fsm::StateId;

use crate::mock_hw::Rig;

const INTERVAL_MS: u64 = 300_000;

#[test]
fn manual_feed_runs_three_excursions_then_rests() {
    let mut rig = Rig::with_defaults();
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Ok(()));
    assert_eq!(rig.app.state(), StateId::Dispensing);
    assert!(rig.app.system_state().dispensing);

    rig.finish_dispense();

    assert_eq!(rig.hw.excursions(45), 3);
    assert_eq!(rig.hw.angles().last(), Some(&90));
    assert_eq!(rig.app.counters().daily_grams, 25);
    assert_eq!(rig.app.counters().total_grams, 25);
    assert!(!rig.app.system_state().dispensing);
    assert!(rig.hw.pulses().contains(&feedback::COMPLETION));
    assert_eq!(
        rig.sink.count(|e| matches!(
            e,
            AppEvent::DispenseCompleted {
                origin: Origin::Manual,
                daily_grams: 25,
                total_grams: 25
            }
        )),
        1
    );
}

#[test]
fn sequence_takes_configured_duration() {
    let mut rig = Rig::with_defaults();
    let start = rig.now_ms;
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();

    rig.run_for(4_650);
    assert_eq!(rig.app.state(), StateId::Dispensing);
    assert_eq!(rig.app.counters().total_grams, 0);

    rig.run_for(50);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.app.counters().last_feeding_ms, Some(start + 4_700));
}

#[test]
fn slow_loop_keeps_chained_deadlines() {
    let mut rig = Rig::with_defaults();
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();

    // One late tick must not stretch the remaining steps.
    rig.jump(2_000);
    rig.run_for(2_700);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert_eq!(rig.app.counters().total_grams, 25);
}

#[test]
fn every_origin_refused_while_dispensing() {
    let mut rig = Rig::with_defaults();
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.run_for(1_000);

    for origin in [Origin::Manual, Origin::Scheduled, Origin::Remote] {
        assert_eq!(
            rig.command(AppCommand::Dispense(origin)),
            Err(Rejection::AlreadyDispensing)
        );
    }
    rig.finish_dispense();
    assert_eq!(rig.hw.excursions(45), 3);
    assert_eq!(rig.app.counters().total_grams, 25);
}

#[test]
fn daily_limit_after_eight_manual_feeds() {
    let mut rig = Rig::with_defaults();
    for n in 1..=8u32 {
        assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Ok(()), "feed {}", n);
        rig.finish_dispense();
        assert_eq!(rig.app.counters().daily_grams, 25 * n);
        rig.jump(INTERVAL_MS);
    }

    assert_eq!(
        rig.command(AppCommand::Dispense(Origin::Manual)),
        Err(Rejection::DailyLimitReached)
    );
    assert_eq!(Rejection::DailyLimitReached.to_string(), "Daily limit reached");
    assert_eq!(rig.app.counters().daily_grams, 200);
}

#[test]
fn remote_ignores_local_rate_limits() {
    let mut rig = Rig::with_defaults();
    for _ in 0..8 {
        rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
        rig.finish_dispense();
        rig.jump(INTERVAL_MS);
    }
    rig.hw.weight = Ok(250.0);
    rig.run_for(600);

    // Daily limit, bowl full and interval all fail for local triggers.
    assert_eq!(
        rig.command(AppCommand::Dispense(Origin::Manual)),
        Err(Rejection::DailyLimitReached)
    );
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Remote)), Ok(()));
    rig.finish_dispense();

    assert_eq!(rig.app.counters().daily_grams, 200);
    assert_eq!(rig.app.counters().total_grams, 225);
}

#[test]
fn too_soon_after_previous_feed() {
    let mut rig = Rig::with_defaults();
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.finish_dispense();

    rig.jump(INTERVAL_MS - 1_000);
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Err(Rejection::TooSoon));
    rig.jump(1_000);
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Ok(()));
}

#[test]
fn remote_feed_restarts_local_interval() {
    let mut rig = Rig::with_defaults();
    rig.command(AppCommand::Dispense(Origin::Remote)).unwrap();
    rig.finish_dispense();
    assert_eq!(rig.app.counters().daily_grams, 0);

    // Any recorded dispense starts the interval, whatever its origin.
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Err(Rejection::TooSoon));
}

#[test]
fn bowl_full_blocks_local_triggers() {
    let mut rig = Rig::with_defaults();
    rig.hw.weight = Ok(250.0);
    rig.run_for(600);

    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Err(Rejection::BowlFull));
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Scheduled)), Err(Rejection::BowlFull));
    assert_eq!(rig.hw.excursions(45), 0);
}

#[test]
fn empty_container_vetoes_remote() {
    let mut rig = Rig::with_defaults();
    rig.hw.distance = Ok(25.0);
    rig.run_for(1_000);

    assert_eq!(rig.command(AppCommand::Dispense(Origin::Remote)), Err(Rejection::NoFood));
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Err(Rejection::NoFood));
    assert_eq!(rig.app.counters().total_grams, 0);
    assert_eq!(rig.hw.last_ambient(), Some(feedback::RED));
}

#[test]
fn rejected_button_press_signals_danger() {
    let mut rig = Rig::with_defaults();
    rig.hw.distance = Ok(25.0);
    rig.run_for(1_000);
    rig.hw.calls.clear();

    let _ = rig.command(AppCommand::Dispense(Origin::Manual));
    assert_eq!(rig.hw.pulses(), vec![feedback::BUTTON_ACK, feedback::DANGER]);
    assert!(rig.hw.angles().is_empty());
}

#[test]
fn refill_toggle_mid_dispense_lets_sequence_finish() {
    let mut rig = Rig::with_defaults();
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.run_for(1_000);

    assert_eq!(rig.command(AppCommand::ToggleRefillMode), Ok(()));
    assert!(rig.app.system_state().refill_mode);
    assert_eq!(rig.app.state(), StateId::CycleWait);

    rig.finish_dispense();
    assert_eq!(rig.hw.excursions(45), 3);
    assert_eq!(rig.app.counters().total_grams, 25);
    assert_eq!(rig.hw.last_ambient(), Some(feedback::YELLOW));

    rig.jump(INTERVAL_MS);
    for origin in [Origin::Manual, Origin::Scheduled, Origin::Remote] {
        assert_eq!(rig.command(AppCommand::Dispense(origin)), Err(Rejection::RefillMode));
    }

    rig.command(AppCommand::ToggleRefillMode).unwrap();
    assert_eq!(rig.hw.last_ambient(), Some(feedback::GREEN));
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Ok(()));
}

#[test]
fn sensor_failure_keeps_last_classification() {
    let mut rig = Rig::with_defaults();
    rig.hw.distance = Err(petfeeder::error::SensorError::EchoTimeout);
    rig.run_for(2_000);

    assert!(!rig.app.sensors().distance_ok);
    assert_eq!(rig.app.sensors().food_level, petfeeder::sensors::FoodLevel::Full);
    assert_eq!(rig.command(AppCommand::Dispense(Origin::Manual)), Ok(()));
}

#[test]
fn completion_publishes_telemetry_even_when_offline() {
    let mut rig = Rig::with_defaults();
    rig.uplink.offline = true;
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.finish_dispense();

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::TelemetryDropped { .. })), 1);
    // A dead uplink never blocks the next request.
    rig.uplink.offline = false;
    rig.jump(INTERVAL_MS);
    rig.command(AppCommand::Dispense(Origin::Manual)).unwrap();
    rig.finish_dispense();
    assert_eq!(rig.uplink.published.last().map(|s| s.total_dispensed_g), Some(50));
}
