//! Outbound application events.
//!
//! The dispatcher and listener tasks emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them; the production binary logs them.

use crate::control::hysteresis::Actuation;
use crate::error::{BusError, DispatchError};
use crate::zones::{Metric, ZoneId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// A listener subscribed and is waiting for messages.
    ListenerStarted { topic: String },

    /// A listener returned.
    ListenerStopped { topic: String, reason: StopReason },

    /// A listener's transport failed and it will retry after a backoff.
    Reconnecting {
        topic: String,
        attempt: u32,
        backoff_ms: u32,
        error: BusError,
    },

    /// A sensor reading was decoded and routed.
    Reading {
        zone: ZoneId,
        metric: Metric,
        value: i32,
    },

    /// A controller flipped and its command was published.
    ActuatorCommanded {
        zone: ZoneId,
        metric: Metric,
        actuation: Actuation,
        topic: String,
    },

    /// A text message arrived; observed only, no control action.
    TextObserved { topic: String, text: String },

    /// A message of a kind that is neither text nor binary.
    UnexpectedMessage { topic: String, kind: String },

    /// An inbound message was dropped or its command could not be published.
    DispatchFailed { topic: String, error: DispatchError },
}

/// Why a listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Graceful shutdown was requested.
    Shutdown,
    /// The transport failed and the reconnect policy is exhausted (or disabled).
    TransportFailure(BusError),
    /// The listener thread panicked.
    Panicked,
}
