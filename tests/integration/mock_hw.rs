//! Mock hardware adapter for integration tests.
//!
//! Records every actuator and indicator call so tests can assert on the
//! full command history without touching real GPIO/PWM registers.

use petfeeder::adapters::time::ManualClock;
use petfeeder::app::commands::AppCommand;
use petfeeder::app::events::AppEvent;
use petfeeder::app::feedback::{PulsePattern, Rgb};
use petfeeder::app::ports::{
    ActuatorPort, EventSink, IndicatorPort, PublishError, SensorPort, TelemetrySink,
};
use petfeeder::app::service::AppService;
use petfeeder::clock::WallClock;
use petfeeder::config::FeederConfig;
use petfeeder::error::SensorError;
use petfeeder::feeding::Rejection;
use petfeeder::fsm::StateId;
use petfeeder::telemetry::TelemetrySnapshot;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    SetAngle(u8),
    Pulse(PulsePattern),
    Ambient(Rgb),
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<HwCall>,
    pub distance: Result<f32, SensorError>,
    pub weight: Result<f32, SensorError>,
    pub motion: bool,
}

#[allow(dead_code)]
impl MockHardware {
    /// Container full, bowl partly eaten, nobody around.
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            distance: Ok(5.0),
            weight: Ok(50.0),
            motion: false,
        }
    }

    pub fn angles(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::SetAngle(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn pulses(&self) -> Vec<PulsePattern> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Pulse(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    pub fn last_ambient(&self) -> Option<Rgb> {
        self.calls.iter().rev().find_map(|c| match c {
            HwCall::Ambient(rgb) => Some(*rgb),
            _ => None,
        })
    }

    /// Number of moves to the dispense angle.
    pub fn excursions(&self, dispense_angle: u8) -> usize {
        self.angles().iter().filter(|&&a| a == dispense_angle).count()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockHardware {
    fn read_distance_cm(&mut self) -> Result<f32, SensorError> {
        self.distance
    }

    fn read_weight_grams(&mut self) -> Result<f32, SensorError> {
        self.weight
    }

    fn motion_detected(&mut self) -> bool {
        self.motion
    }
}

impl ActuatorPort for MockHardware {
    fn set_angle(&mut self, degrees: u8) {
        self.calls.push(HwCall::SetAngle(degrees));
    }
}

impl IndicatorPort for MockHardware {
    fn pulse(&mut self, pattern: PulsePattern) {
        self.calls.push(HwCall::Pulse(pattern));
    }

    fn set_ambient(&mut self, colour: Rgb) {
        self.calls.push(HwCall::Ambient(colour));
    }
}

// ── Event and telemetry recorders ────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingUplink {
    pub published: Vec<TelemetrySnapshot>,
    pub offline: bool,
}

impl TelemetrySink for RecordingUplink {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<(), PublishError> {
        if self.offline {
            return Err(PublishError::Disconnected);
        }
        self.published.push(snapshot.clone());
        Ok(())
    }
}

// ── Rig: service plus all mocks on a simulated timeline ──────

pub struct Rig {
    pub app: AppService,
    pub hw: MockHardware,
    pub clock: ManualClock,
    pub sink: RecordingSink,
    pub uplink: RecordingUplink,
    pub now_ms: u64,
}

/// Control-loop step used by the rig.
pub const STEP_MS: u64 = 50;

#[allow(dead_code)]
impl Rig {
    /// Started service, one tick run at t=0 so sensors are classified.
    pub fn new(config: FeederConfig, wall: Option<WallClock>) -> Self {
        let mut rig = Self {
            app: AppService::new(config),
            hw: MockHardware::new(),
            clock: wall.map(ManualClock::at).unwrap_or_default(),
            sink: RecordingSink::default(),
            uplink: RecordingUplink::default(),
            now_ms: 0,
        };
        rig.app.start(&mut rig.hw, &mut rig.sink);
        rig.tick();
        rig
    }

    pub fn with_defaults() -> Self {
        Self::new(FeederConfig::default(), None)
    }

    pub fn tick(&mut self) {
        self.app
            .tick(self.now_ms, &mut self.hw, &mut self.clock, &mut self.sink, &mut self.uplink);
    }

    /// Advance simulated time in control-loop steps.
    pub fn run_for(&mut self, ms: u64) {
        let end = self.now_ms + ms;
        while self.now_ms < end {
            self.now_ms = (self.now_ms + STEP_MS).min(end);
            self.tick();
        }
    }

    /// Jump the monotonic clock and tick once.
    pub fn jump(&mut self, ms: u64) {
        self.now_ms += ms;
        self.tick();
    }

    pub fn command(&mut self, cmd: AppCommand) -> Result<(), Rejection> {
        self.app
            .handle_command(cmd, self.now_ms, &mut self.hw, &mut self.clock, &mut self.sink)
    }

    /// Step until the dispenser is back in Idle.
    pub fn finish_dispense(&mut self) {
        for _ in 0..1_000 {
            if self.app.state() == StateId::Idle {
                return;
            }
            self.run_for(STEP_MS);
        }
        panic!("dispense did not finish");
    }
}

pub fn wall(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> WallClock {
    WallClock::new(year, month, day, hour, minute, second).expect("valid test date")
}
