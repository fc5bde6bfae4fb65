//! Central Console: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │   StompBus (BusClient)  LogEventSink  JsonFileConfig         │
//! │                                                              │
//! │  ────────────────── Port Trait Boundary ──────────────────   │
//! │                                                              │
//! │   Supervisor ── Listener × N ── Dispatcher ── Hysteresis × N │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::EnvFilter;

use zonectl::adapters::json_config::JsonFileConfig;
use zonectl::adapters::log_sink::LogEventSink;
use zonectl::adapters::stomp::StompBus;
use zonectl::app::dispatcher::Dispatcher;
use zonectl::app::events::StopReason;
use zonectl::app::ports::{ConfigError, ConfigPort, EventSink};
use zonectl::config::ControllerConfig;
use zonectl::supervisor::Supervisor;
use zonectl::zones::RouteTable;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting up Central Console v{}...", env!("CARGO_PKG_VERSION"));

    let store = JsonFileConfig::from_env();
    let config = match store.load() {
        Ok(cfg) => cfg,
        Err(ConfigError::NotFound) => {
            info!("No config at {}, using defaults", store.path().display());
            ControllerConfig::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("loading {}", store.path().display()));
        }
    };

    let routes = Arc::new(RouteTable::from_config(&config).context("building route table")?);
    for route in routes.routes() {
        info!(
            "Route: {} -> {} {} [{}, {}] setpoint {} -> {}",
            route.sensor_topic,
            route.zone,
            route.metric,
            route.band.min,
            route.band.max,
            route.band.setpoint,
            route.actuator_topic
        );
    }

    info!("Broker: {}:{}", config.broker.host, config.broker.port);
    let bus = Arc::new(StompBus::new(config.broker.clone()));
    let sink: Arc<dyn EventSink> = Arc::new(LogEventSink::new());
    let dispatcher = Arc::new(Dispatcher::new(routes, bus.clone(), sink.clone()));

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handlers")?;
    let supervisor = Supervisor::start(bus, dispatcher, sink, config.reconnect)
        .context("starting listeners")?;
    info!("System ready. Waiting for readings on {} topics.", supervisor.topics().count());

    if let Some(signal) = signals.forever().next() {
        info!("Received signal {}, shutting down", signal);
    }

    for (topic, reason) in supervisor.shutdown() {
        match reason {
            StopReason::Shutdown => info!("Listener {} stopped", topic),
            other => warn!("Listener {} had already stopped: {:?}", topic, other),
        }
    }
    info!("Central Console stopped");
    Ok(())
}
