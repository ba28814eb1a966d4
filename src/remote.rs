//! Backend direct methods.
//!
//! The hub delivers a method call as a publish on
//! `$iothub/methods/POST/{method}/?$rid={id}` and expects exactly one reply
//! on `$iothub/methods/res/{status}/?$rid={id}`.  The network thread parses
//! the topic, answers unknown methods itself, and forwards dispense calls
//! to the control loop through [`INBOX`].  The control loop replies via
//! the shared [`OUTBOX`](crate::telemetry::OUTBOX).

use core::fmt::Write;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;
use log::{info, warn};
use serde::Serialize;

use crate::app::ports::RemoteCommandSource;
use crate::error::CommsError;
use crate::feeding::Rejection;
use crate::telemetry::{OutboundMessage, Outbox, Topic};

/// Subscription filter for every direct method.
pub const METHODS_FILTER: &str = "$iothub/methods/POST/#";

const METHOD_PREFIX: &str = "$iothub/methods/POST/";
const RID_MARKER: &str = "?$rid=";

pub const INBOX_DEPTH: usize = 4;

pub type RequestId = String<32>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteMethod {
    /// `runMotors` or `dispense`.
    Dispense,
    Unknown(String<32>),
}

/// A decoded direct-method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    pub method: RemoteMethod,
    pub request_id: RequestId,
}

pub type Inbox = Channel<CriticalSectionRawMutex, RemoteRequest, INBOX_DEPTH>;

/// Network thread → control loop.
pub static INBOX: Inbox = Channel::new();

/// Parse a method-call topic.
pub fn parse_method_topic(topic: &str) -> Result<RemoteRequest, CommsError> {
    let rest = topic.strip_prefix(METHOD_PREFIX).ok_or(CommsError::Malformed)?;
    let (name, rid) = rest.split_once('/').ok_or(CommsError::Malformed)?;
    let rid = rid.strip_prefix(RID_MARKER).ok_or(CommsError::Malformed)?;
    if name.is_empty() || rid.is_empty() {
        return Err(CommsError::Malformed);
    }

    let request_id = RequestId::try_from(rid).map_err(|_| CommsError::Malformed)?;
    let method = match name {
        "runMotors" | "dispense" => RemoteMethod::Dispense,
        other => {
            let mut n = String::new();
            for c in other.chars() {
                if n.push(c).is_err() {
                    break;
                }
            }
            RemoteMethod::Unknown(n)
        }
    };
    Ok(RemoteRequest { method, request_id })
}

// ───────────────────────────────────────────────────────────────
// Responses
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MethodResponse<'a> {
    status: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dispensing: Option<bool>,
}

fn response_topic(status: u16, request_id: &str) -> Topic {
    let mut t = Topic::new();
    let _ = write!(t, "$iothub/methods/res/{}/{}{}", status, RID_MARKER, request_id);
    t
}

/// Reply to a dispense call: 200 on acceptance, 400 with the reason.
pub fn dispense_response(request: &RemoteRequest, outcome: Result<(), Rejection>) -> Option<OutboundMessage> {
    let (status, body) = match outcome {
        Ok(()) => (
            200,
            MethodResponse {
                status: "success",
                message: "Dispensing started",
                reason: None,
                dispensing: Some(true),
            },
        ),
        Err(reason) => (
            400,
            MethodResponse {
                status: "error",
                message: "Cannot dispense",
                reason: Some(reason),
                dispensing: None,
            },
        ),
    };
    OutboundMessage::json(response_topic(status, &request.request_id), &body).ok()
}

/// 404 for a method this firmware does not implement.
pub fn not_found_response(request: &RemoteRequest) -> Option<OutboundMessage> {
    let body = MethodResponse {
        status: "error",
        message: "Method not found",
        reason: None,
        dispensing: None,
    };
    OutboundMessage::json(response_topic(404, &request.request_id), &body).ok()
}

/// Network-thread entry: route one inbound publish.
///
/// Dispense calls go to `inbox`; anything else is answered directly on
/// `outbox`.
pub fn route_method_call(topic: &str, inbox: &Inbox, outbox: &Outbox) -> Result<(), CommsError> {
    let request = parse_method_topic(topic)?;
    if let RemoteMethod::Unknown(name) = &request.method {
        warn!("Remote: unknown method '{}'", name);
        let msg = not_found_response(&request).ok_or(CommsError::Malformed)?;
        return outbox.try_send(msg).map_err(|_| CommsError::ChannelFull);
    }
    info!("Remote: dispense request rid={}", request.request_id);
    inbox.try_send(request).map_err(|_| CommsError::ChannelFull)
}

// ───────────────────────────────────────────────────────────────
// Channel-backed source (control loop side)
// ───────────────────────────────────────────────────────────────

/// [`RemoteCommandSource`] over the inbox and outbox channels.
pub struct ChannelRemoteSource<'a> {
    inbox: &'a Inbox,
    outbox: &'a Outbox,
}

impl<'a> ChannelRemoteSource<'a> {
    pub fn new(inbox: &'a Inbox, outbox: &'a Outbox) -> Self {
        Self { inbox, outbox }
    }
}

impl RemoteCommandSource for ChannelRemoteSource<'_> {
    fn poll(&mut self) -> Option<RemoteRequest> {
        self.inbox.try_receive().ok()
    }

    fn respond(&mut self, request: &RemoteRequest, outcome: Result<(), Rejection>) {
        let Some(msg) = dispense_response(request, outcome) else {
            warn!("Remote: response for rid={} did not encode", request.request_id);
            return;
        };
        if self.outbox.try_send(msg).is_err() {
            warn!("Remote: outbox full, response for rid={} lost", request.request_id);
        }
    }
}
