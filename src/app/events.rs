//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::clock::WallClock;
use crate::feeding::{Origin, Rejection};
use crate::fsm::StateId;
use crate::sensors::{BowlStatus, FoodLevel};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// A request passed eligibility and the servo is moving.
    DispenseAccepted(Origin),

    /// A request was refused; nothing moved.
    DispenseRejected { origin: Origin, reason: Rejection },

    /// The actuation sequence finished and the portion was recorded.
    DispenseCompleted {
        origin: Origin,
        daily_grams: u32,
        total_grams: u32,
    },

    /// Calendar day advanced; the daily total was cleared.
    DailyReset(WallClock),

    RefillModeChanged(bool),

    AutoFeedingChanged(bool),

    FoodLevelChanged(FoodLevel),

    BowlStatusChanged(BowlStatus),

    /// Clock became available (`true`) or was lost (`false`).
    ClockAvailability(bool),

    /// Periodic or post-dispense telemetry handed to the uplink.
    Telemetry { message_id: u32 },

    /// The uplink refused a snapshot.
    TelemetryDropped { message_id: u32 },
}
