//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, servo, indicators, clock, network) implement
//! these traits.  The [`AppService`](super::service::AppService) consumes
//! them via generics, so the domain core never touches hardware directly.

use core::fmt;

use crate::clock::{ClockError, WallClock};
use crate::display::DisplayFrame;
use crate::error::SensorError;
use crate::feeding::Rejection;
use crate::remote::RemoteRequest;
use crate::telemetry::TelemetrySnapshot;

use super::feedback::{PulsePattern, Rgb};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw sensor reads.  Classification happens in the domain.
pub trait SensorPort {
    /// Ultrasonic distance from lid to food surface.
    fn read_distance_cm(&mut self) -> Result<f32, SensorError>;

    /// Bowl load in grams, tare applied.
    fn read_weight_grams(&mut self) -> Result<f32, SensorError>;

    /// Raw PIR output level.
    fn motion_detected(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The dispenser servo.  Open loop: no position feedback.
pub trait ActuatorPort {
    fn set_angle(&mut self, degrees: u8);
}

/// Buzzer plus RGB status LED.
pub trait IndicatorPort {
    /// Queue a pulse train.  Must not block.
    fn pulse(&mut self, pattern: PulsePattern);

    /// Colour shown when no pulse train is playing.
    fn set_ambient(&mut self, colour: Rgb);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time.
pub trait ClockPort {
    fn now(&mut self) -> Result<WallClock, ClockError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Telemetry sink port (best effort)
// ───────────────────────────────────────────────────────────────

/// Hand a snapshot to the backend uplink.  Must return promptly; a failure
/// is reported but never retried by the domain.
pub trait TelemetrySink {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<(), PublishError>;
}

/// Errors from [`TelemetrySink::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Payload did not fit the message buffer.
    Encode,
    /// Uplink queue full; snapshot dropped.
    QueueFull,
    /// No broker connection.
    Disconnected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "encode failed"),
            Self::QueueFull => write!(f, "outbox full"),
            Self::Disconnected => write!(f, "backend disconnected"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Remote command port
// ───────────────────────────────────────────────────────────────

/// Decoded inbound "dispense now" requests from the backend.
pub trait RemoteCommandSource {
    fn poll(&mut self) -> Option<RemoteRequest>;

    /// Send the outcome back to the caller.
    fn respond(&mut self, request: &RemoteRequest, outcome: Result<(), Rejection>);
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// 16x2 character display.
pub trait DisplayPort {
    fn show(&mut self, frame: &DisplayFrame);
}
