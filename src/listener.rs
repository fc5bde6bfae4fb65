//! Listener task: one per subscribed sensor topic.
//!
//! Owns its subscription and blocks in `recv()` until a message arrives or
//! shutdown interrupts it.
//!
//! ```text
//!   subscribe ──▶ recv ──┬─ Binary  ──▶ Dispatcher::handle
//!       ▲                ├─ Text    ──▶ observed only
//!       │                ├─ Other   ──▶ reported, ignored
//!       │                ├─ None    ──▶ keep waiting
//!       └── backoff ◀────┴─ Err     ──▶ retry or stop (this topic only)
//! ```

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::dispatcher::Dispatcher;
use crate::app::events::{AppEvent, StopReason};
use crate::app::ports::{BusClient, BusMessage, EventSink, Subscription};
use crate::backoff::Backoff;
use crate::config::ReconnectPolicy;
use crate::error::BusError;
use crate::shutdown::ShutdownToken;

pub struct Listener<B: BusClient> {
    topic: String,
    bus: Arc<B>,
    dispatcher: Arc<Dispatcher<B>>,
    sink: Arc<dyn EventSink>,
    shutdown: ShutdownToken,
    policy: ReconnectPolicy,
}

impl<B: BusClient> Listener<B> {
    pub fn new(
        topic: impl Into<String>,
        bus: Arc<B>,
        dispatcher: Arc<Dispatcher<B>>,
        sink: Arc<dyn EventSink>,
        shutdown: ShutdownToken,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            topic: topic.into(),
            bus,
            dispatcher,
            sink,
            shutdown,
            policy,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Run until shutdown, or until the transport fails and the reconnect
    /// policy gives up.
    pub fn run(self) -> StopReason {
        let mut backoff = Backoff::new(self.policy);

        let reason = loop {
            if self.shutdown.is_cancelled() {
                break StopReason::Shutdown;
            }

            let error = match self.bus.subscribe(&self.topic) {
                Ok(sub) => {
                    backoff.reset();
                    match self.serve(sub) {
                        Ok(()) => break StopReason::Shutdown,
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            if self.shutdown.is_cancelled() {
                break StopReason::Shutdown;
            }

            let Some((attempt, backoff_ms)) = backoff.next_delay() else {
                break StopReason::TransportFailure(error);
            };
            warn!(
                "Listener '{}': {} (retry {} in {}ms)",
                self.topic, error, attempt, backoff_ms
            );
            self.sink.emit(&AppEvent::Reconnecting {
                topic: self.topic.clone(),
                attempt,
                backoff_ms,
                error,
            });
            if self.shutdown.sleep(Duration::from_millis(backoff_ms.into())) {
                break StopReason::Shutdown;
            }
        };

        self.sink.emit(&AppEvent::ListenerStopped {
            topic: self.topic.clone(),
            reason: reason.clone(),
        });
        reason
    }

    /// Receive loop over one subscription.  `Ok(())` means shutdown.
    fn serve(&self, mut sub: B::Subscription) -> Result<(), BusError> {
        let registration = self.shutdown.register(sub.interrupter());
        info!("Starting listener - topic: {}", self.topic);
        self.sink.emit(&AppEvent::ListenerStarted {
            topic: self.topic.clone(),
        });

        let outcome = loop {
            if self.shutdown.is_cancelled() {
                break Ok(());
            }
            match sub.recv() {
                Ok(Some(message)) => self.on_message(message),
                Ok(None) => {}
                Err(_) if self.shutdown.is_cancelled() => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        drop(registration);
        if let Err(e) = sub.close() {
            debug!("Listener '{}': close failed: {}", self.topic, e);
        }
        outcome
    }

    fn on_message(&self, message: BusMessage) {
        match message {
            BusMessage::Binary(bytes) => {
                // Failures are reported by the dispatcher itself.
                let _ = self.dispatcher.handle(&self.topic, &bytes);
            }
            BusMessage::Text(text) => {
                self.sink.emit(&AppEvent::TextObserved {
                    topic: self.topic.clone(),
                    text,
                });
            }
            BusMessage::Other { kind } => {
                self.sink.emit(&AppEvent::UnexpectedMessage {
                    topic: self.topic.clone(),
                    kind,
                });
            }
        }
    }
}
