//! In-process message bus.
//!
//! Implements [`BusClient`] without a broker: every subscription gets its
//! own bounded `embassy-sync` channel, and publishing fans a message out to
//! every subscriber of the topic.  Used by the integration tests and for
//! running the controller against simulated offices in one process.
//!
//! ```text
//!   publish / inject ──▶ ┌──────────────┐ ──▶ Mailbox (sub 1) ──▶ recv()
//!                        │   Registry   │ ──▶ Mailbox (sub 2) ──▶ recv()
//!                        └──────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::debug;
use parking_lot::Mutex;

use crate::app::ports::{BusClient, BusMessage, Interrupter, Subscription};
use crate::error::BusError;

/// Per-subscription queue depth.
const MAILBOX_DEPTH: usize = 64;

enum Delivery {
    Message(BusMessage),
    /// Unblocks a pending `recv()` without a message.
    Wake,
}

struct Mailbox {
    queue: Channel<CriticalSectionRawMutex, Delivery, MAILBOX_DEPTH>,
    closed: AtomicBool,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Channel::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let _ = self.queue.try_send(Delivery::Wake);
    }
}

#[derive(Default)]
struct Registry {
    topics: Mutex<HashMap<String, Vec<(u64, Arc<Mailbox>)>>>,
    published: Mutex<Vec<(String, String)>>,
    next_id: AtomicU64,
}

impl Registry {
    /// Deliver to every subscriber of `topic`.  Returns how many got it.
    fn deliver(&self, topic: &str, message: &BusMessage) -> Result<usize, BusError> {
        let topics = self.topics.lock();
        let Some(subs) = topics.get(topic) else {
            return Ok(0);
        };
        let mut delivered = 0;
        let mut full = false;
        for (id, mailbox) in subs {
            if mailbox.queue.try_send(Delivery::Message(message.clone())).is_ok() {
                delivered += 1;
            } else {
                debug!("MemoryBus: subscriber {} on '{}' is full", id, topic);
                full = true;
            }
        }
        if full {
            return Err(BusError::QueueFull);
        }
        Ok(delivered)
    }

    fn remove(&self, topic: &str, id: u64) {
        let mut topics = self.topics.lock();
        if let Some(subs) = topics.get_mut(topic) {
            subs.retain(|(sub_id, _)| *sub_id != id);
            if subs.is_empty() {
                topics.remove(topic);
            }
        }
    }
}

/// Cheap to clone; clones share the same registry.
#[derive(Clone, Default)]
pub struct MemoryBus {
    registry: Arc<Registry>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an arbitrary message to every subscriber of `topic`.
    pub fn inject(&self, topic: &str, message: BusMessage) -> Result<usize, BusError> {
        self.registry.deliver(topic, &message)
    }

    /// Publish a sensor reading the way the office simulators do: as bytes.
    pub fn send_reading(&self, topic: &str, payload: &str) -> Result<usize, BusError> {
        self.inject(topic, BusMessage::Binary(payload.as_bytes().to_vec()))
    }

    /// Close every subscription on `topic`; their next `recv()` fails with
    /// [`BusError::Closed`].
    pub fn sever(&self, topic: &str) {
        let removed = self.registry.topics.lock().remove(topic).unwrap_or_default();
        for (_, mailbox) in removed {
            mailbox.close();
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.registry.topics.lock().get(topic).map_or(0, Vec::len)
    }

    /// Every `(topic, payload)` passed to [`BusClient::publish`], in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.registry.published.lock().clone()
    }
}

impl BusClient for MemoryBus {
    type Subscription = MemorySubscription;

    fn subscribe(&self, topic: &str) -> Result<MemorySubscription, BusError> {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let mailbox = Arc::new(Mailbox::new());
        self.registry
            .topics
            .lock()
            .entry(topic.to_owned())
            .or_default()
            .push((id, mailbox.clone()));
        Ok(MemorySubscription {
            topic: topic.to_owned(),
            id,
            mailbox,
            registry: self.registry.clone(),
        })
    }

    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        self.registry
            .published
            .lock()
            .push((topic.to_owned(), payload.to_owned()));
        self.registry
            .deliver(topic, &BusMessage::Text(payload.to_owned()))
            .map(|_| ())
    }
}

pub struct MemorySubscription {
    topic: String,
    id: u64,
    mailbox: Arc<Mailbox>,
    registry: Arc<Registry>,
}

impl Subscription for MemorySubscription {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn recv(&mut self) -> Result<Option<BusMessage>, BusError> {
        if self.mailbox.closed.load(Ordering::Acquire) {
            return Err(BusError::Closed);
        }
        match futures_lite::future::block_on(self.mailbox.queue.receive()) {
            Delivery::Message(message) => Ok(Some(message)),
            Delivery::Wake if self.mailbox.closed.load(Ordering::Acquire) => Err(BusError::Closed),
            Delivery::Wake => Ok(None),
        }
    }

    fn interrupter(&self) -> Interrupter {
        let mailbox = self.mailbox.clone();
        Interrupter::new(move || {
            let _ = mailbox.queue.try_send(Delivery::Wake);
        })
    }

    fn close(self) -> Result<(), BusError> {
        self.registry.remove(&self.topic, self.id);
        Ok(())
    }
}
