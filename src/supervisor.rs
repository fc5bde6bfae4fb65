//! Supervisor: one named thread per sensor topic.
//!
//! ```text
//!   Supervisor::start
//!     ├── listen-LectIlum1 ─┐
//!     ├── listen-LectTemp1 ─┤  each: Listener::run() → StopReason
//!     ├── listen-LectIlum2 ─┤
//!     └── listen-LectTemp2 ─┘
//!   Supervisor::shutdown  → cancel token, interrupt receives, join all
//! ```
//!
//! Listeners run in parallel on OS threads.  A failing listener affects
//! only its own topic; the others keep running.

use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::app::dispatcher::Dispatcher;
use crate::app::events::StopReason;
use crate::app::ports::{BusClient, EventSink};
use crate::config::ReconnectPolicy;
use crate::error::{Error, Result};
use crate::listener::Listener;
use crate::shutdown::ShutdownToken;

/// Stack size for listener threads.
const LISTENER_STACK_KB: usize = 256;

struct ListenerHandle {
    topic: String,
    handle: JoinHandle<StopReason>,
}

pub struct Supervisor {
    shutdown: ShutdownToken,
    listeners: Vec<ListenerHandle>,
}

impl Supervisor {
    /// Spawn one listener per sensor topic in the dispatcher's route table,
    /// then return.  If any spawn fails, the listeners already started are
    /// shut down before the error is returned.
    pub fn start<B: BusClient>(
        bus: Arc<B>,
        dispatcher: Arc<Dispatcher<B>>,
        sink: Arc<dyn EventSink>,
        policy: ReconnectPolicy,
    ) -> Result<Self> {
        let mut supervisor = Self {
            shutdown: ShutdownToken::new(),
            listeners: Vec::with_capacity(dispatcher.routes().len()),
        };

        let topics: Vec<String> = dispatcher.routes().sensor_topics().map(str::to_owned).collect();
        for topic in topics {
            let listener = Listener::new(
                topic.clone(),
                bus.clone(),
                dispatcher.clone(),
                sink.clone(),
                supervisor.shutdown.clone(),
                policy,
            );
            match spawn_named(&format!("listen-{topic}"), LISTENER_STACK_KB, move || {
                listener.run()
            }) {
                Ok(handle) => supervisor.listeners.push(ListenerHandle { topic, handle }),
                Err(e) => {
                    error!("Supervisor: failed to spawn listener for '{}': {}", topic, e);
                    supervisor.shutdown();
                    return Err(Error::Spawn(e.kind()));
                }
            }
        }

        info!("Supervisor: {} listeners running", supervisor.listeners.len());
        Ok(supervisor)
    }

    /// Topics with a listener, in start order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|l| l.topic.as_str())
    }

    /// Number of listeners whose thread has not yet returned.
    pub fn running(&self) -> usize {
        self.listeners.iter().filter(|l| !l.handle.is_finished()).count()
    }

    /// Signal every listener, interrupt pending receives, and join them.
    pub fn shutdown(self) -> Vec<(String, StopReason)> {
        info!("Supervisor: shutting down {} listeners", self.listeners.len());
        self.shutdown.cancel();
        self.wait()
    }

    /// Join every listener.  Blocks until each one stops.
    pub fn wait(self) -> Vec<(String, StopReason)> {
        self.listeners
            .into_iter()
            .map(|l| {
                let reason = l.handle.join().unwrap_or_else(|_| {
                    error!("Listener '{}' panicked", l.topic);
                    StopReason::Panicked
                });
                (l.topic, reason)
            })
            .collect()
    }
}

/// Spawn a named thread with an explicit stack size.
fn spawn_named<T: Send + 'static>(
    name: &str,
    stack_kb: usize,
    f: impl FnOnce() -> T + Send + 'static,
) -> std::io::Result<JoinHandle<T>> {
    info!("Spawning '{}' (stack={}KB)", name, stack_kb);
    std::thread::Builder::new()
        .name(name.into())
        .stack_size(stack_kb * 1024)
        .spawn(f)
}
