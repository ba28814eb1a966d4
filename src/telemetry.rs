//! Telemetry payload and the fire-and-forget uplink.
//!
//! The control loop serialises a [`TelemetrySnapshot`] and drops it into
//! the bounded [`OUTBOX`] with `try_send`.  The network thread drains the
//! outbox asynchronously and hands each message to a [`MessagePublisher`].
//! A full outbox or a broker failure loses the message; it never reaches
//! back into dispensing state or counters.
//!
//! ```text
//!  ┌──────────────┐  OutboundMessage  ┌────────────────┐
//!  │ Control Loop │──────────────────▶│ Network Thread │──▶ MQTT
//!  │  (sync)      │   try_send/drop   │  (async pump)  │
//!  └──────────────┘                   └────────────────┘
//! ```

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{String, Vec};
use log::{debug, warn};
use serde::{Serialize, Serializer};

use crate::app::ports::{PublishError, TelemetrySink};
use crate::clock::WallClock;
use crate::error::CommsError;
use crate::feeding::FeedingStatus;
use crate::scheduler::NextFeed;
use crate::sensors::{BowlStatus, FoodLevel};

/// Longest topic we build (`$iothub/...` responses and device events).
pub const TOPIC_MAX: usize = 96;
/// Serialized JSON limit per message.
pub const PAYLOAD_MAX: usize = 768;
/// Messages buffered between control loop and network thread.
pub const OUTBOX_DEPTH: usize = 8;

pub type Topic = String<TOPIC_MAX>;
pub type Payload = Vec<u8, PAYLOAD_MAX>;

/// One message waiting for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub topic: Topic,
    pub payload: Payload,
}

impl OutboundMessage {
    /// Serialize `body` as JSON for `topic`.
    pub fn json<T: Serialize>(topic: Topic, body: &T) -> Result<Self, PublishError> {
        let bytes = serde_json::to_vec(body).map_err(|_| PublishError::Encode)?;
        let mut payload = Payload::new();
        payload
            .extend_from_slice(&bytes)
            .map_err(|_| PublishError::Encode)?;
        Ok(Self { topic, payload })
    }
}

pub type Outbox = Channel<CriticalSectionRawMutex, OutboundMessage, OUTBOX_DEPTH>;

/// Control loop → network thread.
pub static OUTBOX: Outbox = Channel::new();

/// `devices/{id}/messages/events/`
pub fn telemetry_topic(device_id: &str) -> Topic {
    let mut t = Topic::new();
    let _ = write!(t, "devices/{}/messages/events/", device_id);
    t
}

// ───────────────────────────────────────────────────────────────
// Snapshot
// ───────────────────────────────────────────────────────────────

/// Everything the backend sees about the feeder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub message_id: u32,
    pub device_id: String<32>,
    /// Local wall time, `null` while the clock is unavailable.
    #[serde(serialize_with = "as_display")]
    pub timestamp: Option<WallClock>,
    pub uptime_ms: u64,
    pub bowl_weight: f32,
    pub container_level: FoodLevel,
    pub bowl_status: BowlStatus,
    /// PIR presence after hold-off.
    pub pet_status: bool,
    pub dispensing: bool,
    pub refill_mode: bool,
    pub auto_feeding: bool,
    pub daily_dispensed_g: u32,
    pub total_dispensed_g: u32,
    pub feeding_status: FeedingStatus,
    #[serde(serialize_with = "as_display")]
    pub next_feed: Option<NextFeed>,
    #[serde(serialize_with = "as_display")]
    pub last_feeding: Option<WallClock>,
    pub rtc_ready: bool,
    pub distance_ok: bool,
    pub weight_ok: bool,
}

fn as_display<T: core::fmt::Display, S: Serializer>(v: &Option<T>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(v) => s.collect_str(v),
        None => s.serialize_none(),
    }
}

// ───────────────────────────────────────────────────────────────
// Channel-backed sink (control loop side)
// ───────────────────────────────────────────────────────────────

/// [`TelemetrySink`] that enqueues onto an [`Outbox`] without blocking.
pub struct ChannelTelemetrySink<'a> {
    outbox: &'a Outbox,
    topic: Topic,
    dropped: u32,
}

impl<'a> ChannelTelemetrySink<'a> {
    pub fn new(outbox: &'a Outbox, device_id: &str) -> Self {
        Self {
            outbox,
            topic: telemetry_topic(device_id),
            dropped: 0,
        }
    }

    /// Snapshots lost to a full outbox since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl TelemetrySink for ChannelTelemetrySink<'_> {
    fn publish(&mut self, snapshot: &TelemetrySnapshot) -> Result<(), PublishError> {
        let msg = OutboundMessage::json(self.topic.clone(), snapshot)?;
        if self.outbox.try_send(msg).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
            debug!("Telemetry: outbox full, {} snapshots lost since boot", self.dropped());
            return Err(PublishError::QueueFull);
        }
        debug!("Telemetry: #{} queued", snapshot.message_id);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Pump (network thread side)
// ───────────────────────────────────────────────────────────────

/// Something that can put bytes on a broker topic.
pub trait MessagePublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;
}

/// Wait for the next outbound message and publish it.
pub async fn pump_once(outbox: &Outbox, publisher: &mut impl MessagePublisher) -> Result<(), CommsError> {
    let msg = outbox.receive().await;
    publisher.publish(&msg.topic, &msg.payload).inspect_err(|e| {
        warn!("Uplink: publish to {} failed: {}", msg.topic, e);
    })
}

/// Drain the outbox forever.  Failed messages are dropped.
pub async fn pump(outbox: &Outbox, publisher: &mut impl MessagePublisher) {
    loop {
        let _ = pump_once(outbox, publisher).await;
    }
}
