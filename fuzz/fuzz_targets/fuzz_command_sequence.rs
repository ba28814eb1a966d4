//! Fuzz target: `AppService` under arbitrary command and timing sequences.
//!
//! Each input byte pair is (command, elapsed ms).  After every step the
//! servo must never be asked to move outside a sequence, and local feeding
//! must never pass the daily cap.
//!
//! cargo fuzz run fuzz_command_sequence

#![no_main]

use libfuzzer_sys::fuzz_target;
use petfeeder::adapters::time::ManualClock;
use petfeeder::app::commands::AppCommand;
use petfeeder::app::events::AppEvent;
use petfeeder::app::feedback::{PulsePattern, Rgb};
use petfeeder::app::ports::{
    ActuatorPort, EventSink, IndicatorPort, PublishError, SensorPort, TelemetrySink,
};
use petfeeder::app::service::AppService;
use petfeeder::config::FeederConfig;
use petfeeder::error::SensorError;
use petfeeder::feeding::Origin;
use petfeeder::telemetry::TelemetrySnapshot;

struct Bench {
    distance: f32,
    weight: f32,
    dispense_moves: u32,
}

impl SensorPort for Bench {
    fn read_distance_cm(&mut self) -> Result<f32, SensorError> {
        Ok(self.distance)
    }
    fn read_weight_grams(&mut self) -> Result<f32, SensorError> {
        Ok(self.weight)
    }
    fn motion_detected(&mut self) -> bool {
        false
    }
}

impl ActuatorPort for Bench {
    fn set_angle(&mut self, degrees: u8) {
        if degrees == 45 {
            self.dispense_moves += 1;
        }
    }
}

impl IndicatorPort for Bench {
    fn pulse(&mut self, _pattern: PulsePattern) {}
    fn set_ambient(&mut self, _colour: Rgb) {}
}

struct Quiet;

impl EventSink for Quiet {
    fn emit(&mut self, _event: &AppEvent) {}
}

impl TelemetrySink for Quiet {
    fn publish(&mut self, _snapshot: &TelemetrySnapshot) -> Result<(), PublishError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let config = FeederConfig::default();
    let cycles = u32::from(config.dispense_cycles);
    let max_daily = config.max_daily_grams;
    let mut app = AppService::new(config);
    let mut hw = Bench {
        distance: 5.0,
        weight: 50.0,
        dispense_moves: 0,
    };
    let mut clock = ManualClock::new();
    let mut now_ms = 0u64;

    app.start(&mut hw, &mut Quiet);

    for pair in data.chunks_exact(2) {
        let cmd = match pair[0] % 8 {
            0 => Some(AppCommand::Dispense(Origin::Manual)),
            1 => Some(AppCommand::Dispense(Origin::Scheduled)),
            2 => Some(AppCommand::Dispense(Origin::Remote)),
            3 => Some(AppCommand::ToggleRefillMode),
            4 => {
                hw.distance = f32::from(pair[1] % 30);
                None
            }
            5 => {
                hw.weight = f32::from(pair[1]) * 2.0;
                None
            }
            _ => None,
        };
        if let Some(cmd) = cmd {
            let _ = app.handle_command(cmd, now_ms, &mut hw, &mut clock, &mut Quiet);
        }

        now_ms += u64::from(pair[1]) * 50;
        app.tick(now_ms, &mut hw, &mut clock, &mut Quiet, &mut Quiet);

        let c = app.counters();
        assert!(c.daily_grams <= max_daily);
        let started = c.total_grams / app.config().portion_grams;
        let in_flight = u32::from(app.system_state().dispensing);
        assert!(hw.dispense_moves <= (started + in_flight) * cycles);
    }
});
