//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each application event as one log
//! record.  The binary routes these through `tracing-subscriber` to stderr.

use log::{Level, log};

use crate::app::events::{AppEvent, StopReason};
use crate::app::ports::EventSink;
use crate::control::hysteresis::Actuation;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        let (level, line) = render(event);
        log!(level, "{}", line);
    }
}

/// Severity and text of the log record for `event`.
pub fn render(event: &AppEvent) -> (Level, String) {
    match event {
        AppEvent::ListenerStarted { topic } => (Level::Info, format!("LISTEN | {topic} | started")),
        AppEvent::ListenerStopped { topic, reason } => match reason {
            StopReason::Shutdown => (Level::Info, format!("LISTEN | {topic} | stopped")),
            StopReason::TransportFailure(e) => {
                (Level::Error, format!("LISTEN | {topic} | stopped: {e}"))
            }
            StopReason::Panicked => (Level::Error, format!("LISTEN | {topic} | panicked")),
        },
        AppEvent::Reconnecting {
            topic,
            attempt,
            backoff_ms,
            error,
        } => (
            Level::Warn,
            format!("LISTEN | {topic} | {error}, reconnect #{attempt} in {backoff_ms}ms"),
        ),
        AppEvent::Reading {
            zone,
            metric,
            value,
        } => (
            Level::Info,
            format!("READ | {zone} {metric}={value} {}", metric.unit()),
        ),
        AppEvent::ActuatorCommanded {
            zone,
            metric,
            actuation,
            topic,
        } => {
            let line = match actuation {
                Actuation::Activate(setpoint) => {
                    format!("ACT | Start {metric} activator for {zone}, setpoint={setpoint} -> {topic}")
                }
                Actuation::Deactivate => {
                    format!("ACT | Deactivate {metric} activator for {zone} -> {topic}")
                }
            };
            (Level::Info, line)
        }
        AppEvent::TextObserved { topic, text } => {
            (Level::Info, format!("TEXT | {topic} | {text}"))
        }
        AppEvent::UnexpectedMessage { topic, kind } => (
            Level::Warn,
            format!("MSG | {topic} | unexpected message kind '{kind}'"),
        ),
        AppEvent::DispatchFailed { topic, error } => {
            (Level::Warn, format!("DROP | {topic} | {error}"))
        }
    }
}
