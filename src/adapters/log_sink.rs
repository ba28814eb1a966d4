//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART in production).  One line per event, tagged
//! by subsystem so a serial capture can be grepped.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::DispenseAccepted(origin) => {
                info!("DISPENSE | accepted | origin={}", origin);
            }
            AppEvent::DispenseRejected { origin, reason } => {
                warn!("DISPENSE | rejected | origin={} | reason={}", origin, reason);
            }
            AppEvent::DispenseCompleted {
                origin,
                daily_grams,
                total_grams,
            } => {
                info!(
                    "DISPENSE | complete | origin={} | daily={}g total={}g",
                    origin, daily_grams, total_grams
                );
            }
            AppEvent::DailyReset(at) => {
                info!("DAY | counters reset at {}", at);
            }
            AppEvent::RefillModeChanged(on) => {
                info!("MODE | refill={}", if *on { "ON" } else { "OFF" });
            }
            AppEvent::AutoFeedingChanged(on) => {
                info!("MODE | auto_feeding={}", if *on { "ON" } else { "OFF" });
            }
            AppEvent::FoodLevelChanged(level) => {
                info!("SENSOR | container={}", level);
            }
            AppEvent::BowlStatusChanged(status) => {
                info!("SENSOR | bowl={}", status);
            }
            AppEvent::ClockAvailability(ok) => {
                if *ok {
                    info!("CLOCK | available");
                } else {
                    warn!("CLOCK | unavailable, schedule suspended");
                }
            }
            AppEvent::Telemetry { message_id } => {
                info!("TELEM | queued id={}", message_id);
            }
            AppEvent::TelemetryDropped { message_id } => {
                warn!("TELEM | dropped id={}", message_id);
            }
        }
    }
}
