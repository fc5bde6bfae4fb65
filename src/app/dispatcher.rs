//! Dispatcher: the hexagonal core.
//!
//! Routes an inbound `(topic, payload)` pair to the controller for that
//! zone × metric, and publishes whatever command the controller produces.
//!
//! ```text
//!   Listener ──▶ ┌──────────────────────────────┐ ──▶ BusClient::publish
//!                │          Dispatcher           │
//!                │ RouteTable · controller arena │ ──▶ EventSink
//!                └──────────────────────────────┘
//! ```
//!
//! The controller arena holds one slot per route.  Each slot has its own
//! lock; with one listener per sensor topic the locks are never contended,
//! but the arena stays correct if several tasks ever feed the same pair.

use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;

use crate::control::hysteresis::{Engagement, HysteresisController};
use crate::error::{DispatchError, PayloadError};
use crate::zones::RouteTable;

use super::commands::ActuatorCommand;
use super::events::AppEvent;
use super::ports::{BusClient, EventSink};

pub struct Dispatcher<B: BusClient> {
    routes: Arc<RouteTable>,
    controllers: Vec<Mutex<HysteresisController>>,
    bus: Arc<B>,
    sink: Arc<dyn EventSink>,
}

impl<B: BusClient> Dispatcher<B> {
    /// Build one disengaged controller per route.
    pub fn new(routes: Arc<RouteTable>, bus: Arc<B>, sink: Arc<dyn EventSink>) -> Self {
        let controllers = routes
            .routes()
            .iter()
            .map(|r| Mutex::new(HysteresisController::new(r.band)))
            .collect();
        Self {
            routes,
            controllers,
            bus,
            sink,
        }
    }

    /// Handle one inbound message.
    ///
    /// Returns the command that was published, `None` if the controller did
    /// not transition.  Every error is also reported through the event sink.
    pub fn handle(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<Option<ActuatorCommand>, DispatchError> {
        let result = self.dispatch(topic, payload);
        if let Err(error) = &result {
            self.sink.emit(&AppEvent::DispatchFailed {
                topic: topic.to_owned(),
                error: error.clone(),
            });
        }
        result
    }

    fn dispatch(
        &self,
        topic: &str,
        payload: &[u8],
    ) -> Result<Option<ActuatorCommand>, DispatchError> {
        let (id, route) = self
            .routes
            .lookup(topic)
            .ok_or_else(|| DispatchError::UnknownTopic(topic.to_owned()))?;
        let reading = parse_reading(payload)?;

        self.sink.emit(&AppEvent::Reading {
            zone: route.zone.clone(),
            metric: route.metric,
            value: reading,
        });

        let actuation = self.controllers[id].lock().evaluate(reading);
        let Some(actuation) = actuation else {
            debug!("{} {}={} no transition", route.zone, route.metric, reading);
            return Ok(None);
        };

        let command = ActuatorCommand::new(route.metric, actuation);
        self.bus
            .publish(&route.actuator_topic, &command.encode())
            .map_err(|source| DispatchError::Publish { command, source })?;

        self.sink.emit(&AppEvent::ActuatorCommanded {
            zone: route.zone.clone(),
            metric: route.metric,
            actuation,
            topic: route.actuator_topic.clone(),
        });
        Ok(Some(command))
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Current engagement of the controller fed by `sensor_topic`.
    pub fn engagement(&self, sensor_topic: &str) -> Option<Engagement> {
        let (id, _) = self.routes.lookup(sensor_topic)?;
        Some(self.controllers[id].lock().state())
    }

    /// Engagement of every controller, in route order.
    pub fn snapshot(&self) -> Vec<Engagement> {
        self.controllers.iter().map(|c| c.lock().state()).collect()
    }
}

/// Decode a sensor payload: UTF-8 text holding a base-10 signed integer.
/// Surrounding whitespace and a leading sign are accepted.
pub fn parse_reading(payload: &[u8]) -> Result<i32, PayloadError> {
    let text = core::str::from_utf8(payload).map_err(|_| PayloadError::InvalidUtf8)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(PayloadError::Empty);
    }
    text.parse::<i32>().map_err(|e| match e.kind() {
        core::num::IntErrorKind::PosOverflow | core::num::IntErrorKind::NegOverflow => {
            PayloadError::OutOfRange
        }
        _ => PayloadError::NotAnInteger,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_signed_integers() {
        assert_eq!(parse_reading(b"350"), Ok(350));
        assert_eq!(parse_reading(b"-4"), Ok(-4));
        assert_eq!(parse_reading(b"+21"), Ok(21));
        assert_eq!(parse_reading(b" 22\n"), Ok(22));
    }

    #[test]
    fn rejects_non_integers() {
        assert_eq!(parse_reading(b"abc"), Err(PayloadError::NotAnInteger));
        assert_eq!(parse_reading(b"21.5"), Err(PayloadError::NotAnInteger));
        assert_eq!(parse_reading(b"22C"), Err(PayloadError::NotAnInteger));
        assert_eq!(parse_reading(b"  "), Err(PayloadError::Empty));
        assert_eq!(parse_reading(&[0xff, 0xfe]), Err(PayloadError::InvalidUtf8));
        assert_eq!(parse_reading(b"99999999999"), Err(PayloadError::OutOfRange));
    }
}
