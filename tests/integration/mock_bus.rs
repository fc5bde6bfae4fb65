//! Mock adapters for integration tests.
//!
//! `RecordingSink` keeps every emitted event so tests can assert on the full
//! history.  `FailingBus` refuses every operation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use zonectl::adapters::memory_bus::{MemoryBus, MemorySubscription};
use zonectl::app::dispatcher::Dispatcher;
use zonectl::app::events::AppEvent;
use zonectl::app::ports::{BusClient, EventSink};
use zonectl::config::ControllerConfig;
use zonectl::error::BusError;
use zonectl::zones::RouteTable;

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AppEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<AppEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &AppEvent) {
        self.events.lock().push(event.clone());
    }
}

// ── FailingBus ────────────────────────────────────────────────

/// Every subscribe and publish fails with the configured error.
pub struct FailingBus {
    pub error: BusError,
}

impl BusClient for FailingBus {
    type Subscription = MemorySubscription;

    fn subscribe(&self, _topic: &str) -> Result<MemorySubscription, BusError> {
        Err(self.error.clone())
    }

    fn publish(&self, _topic: &str, _payload: &str) -> Result<(), BusError> {
        Err(self.error.clone())
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// Dispatcher over the default two-office routes.
#[allow(dead_code)]
pub fn testbed<B: BusClient>(bus: Arc<B>, sink: Arc<RecordingSink>) -> Arc<Dispatcher<B>> {
    let routes = RouteTable::from_config(&ControllerConfig::default()).unwrap();
    Arc::new(Dispatcher::new(Arc::new(routes), bus, sink))
}

#[allow(dead_code)]
pub fn memory_testbed() -> (Arc<MemoryBus>, Arc<RecordingSink>, Arc<Dispatcher<MemoryBus>>) {
    let bus = Arc::new(MemoryBus::new());
    let sink = RecordingSink::new();
    let dispatcher = testbed(bus.clone(), sink.clone());
    (bus, sink, dispatcher)
}

/// Poll `cond` until it holds or two seconds pass.
#[allow(dead_code)]
pub fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
