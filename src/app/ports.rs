//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Dispatcher / Listener (domain)
//! ```
//!
//! Driven adapters (message bus, event sinks, config storage) implement these
//! traits.  The domain core consumes them via generics or trait objects and
//! never touches a socket or a file directly.

use core::fmt;
use std::sync::Arc;

use crate::config::ControllerConfig;
use crate::error::BusError;

// ───────────────────────────────────────────────────────────────
// Message bus (driven adapter: broker ↔ domain)
// ───────────────────────────────────────────────────────────────

/// A message as delivered by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusMessage {
    /// Textual body.  Observed only; never drives control.
    Text(String),
    /// Raw bytes.  Sensor readings arrive this way.
    Binary(Vec<u8>),
    /// Anything else the transport can deliver, tagged with its kind.
    Other { kind: String },
}

impl BusMessage {
    pub fn kind(&self) -> &str {
        match self {
            Self::Text(_) => "text",
            Self::Binary(_) => "binary",
            Self::Other { kind } => kind,
        }
    }
}

/// Publish/subscribe access to the message bus.
///
/// Implementations must tolerate concurrent, independent use from several
/// threads: every listener subscribes on its own, and publishes may happen
/// from any listener.
pub trait BusClient: Send + Sync + 'static {
    type Subscription: Subscription;

    /// Open a dedicated subscription to `topic`.
    fn subscribe(&self, topic: &str) -> Result<Self::Subscription, BusError>;

    /// Send a text payload to `topic`.
    fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;
}

/// A single topic subscription owned by one listener.
pub trait Subscription: Send + 'static {
    fn topic(&self) -> &str;

    /// Block until the next message arrives.
    ///
    /// Returns `Ok(None)` for an empty receive (nothing delivered, or the
    /// wait was interrupted) and `Err` when the transport fails.
    fn recv(&mut self) -> Result<Option<BusMessage>, BusError>;

    /// Handle that unblocks a pending [`recv`](Self::recv) from another thread.
    fn interrupter(&self) -> Interrupter;

    /// Unsubscribe and release the underlying connection.
    fn close(self) -> Result<(), BusError>
    where
        Self: Sized;
}

/// Cloneable wake-up handle for a blocked subscription.
#[derive(Clone)]
pub struct Interrupter(Arc<dyn Fn() + Send + Sync>);

impl Interrupter {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn interrupt(&self) {
        (self.0)();
    }
}

impl fmt::Debug for Interrupter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Interrupter")
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Shared by every listener thread, hence `&self`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate before persisting and reject invalid
/// ranges with [`ConfigError::ValidationFailed`] rather than clamping.
pub trait ConfigPort {
    /// Load configuration.  Returns [`ConfigError::NotFound`] if none is stored.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No stored config.
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
