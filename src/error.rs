//! Unified error types for the zone controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! supervisor's and listener's reporting uniform.  None of these are fatal
//! to the process: each is handled by the task that encountered it.

use core::fmt;

use crate::app::commands::ActuatorCommand;
use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The message bus failed (connect, subscribe, receive, publish).
    Bus(BusError),
    /// An inbound message could not be dispatched.
    Dispatch(DispatchError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A listener thread could not be spawned.
    Spawn(std::io::ErrorKind),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Spawn(kind) => write!(f, "thread spawn failed: {kind}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Transport-level failures reported by a [`BusClient`](crate::app::ports::BusClient)
/// or one of its subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Socket-level failure.
    Io(std::io::ErrorKind),
    /// The connection or subscription was closed.
    Closed,
    /// The peer sent something that violates the wire protocol.
    Protocol(&'static str),
    /// The broker rejected a request (STOMP `ERROR` frame).
    Broker(String),
    /// A subscriber's queue is full; the message was not delivered.
    QueueFull,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
            Self::Closed => write!(f, "connection closed"),
            Self::Protocol(msg) => write!(f, "protocol violation: {msg}"),
            Self::Broker(msg) => write!(f, "broker error: {msg}"),
            Self::QueueFull => write!(f, "subscriber queue full"),
        }
    }
}

impl std::error::Error for BusError {}

impl From<std::io::Error> for BusError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe => Self::Closed,
            kind => Self::Io(kind),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

/// Why an inbound payload could not be turned into a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    /// The bytes are not valid UTF-8.
    InvalidUtf8,
    /// The text is empty (after trimming whitespace).
    Empty,
    /// The text is not a base-10 integer.
    NotAnInteger,
    /// The integer does not fit a 32-bit reading.
    OutOfRange,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUtf8 => write!(f, "payload is not valid UTF-8"),
            Self::Empty => write!(f, "payload is empty"),
            Self::NotAnInteger => write!(f, "payload is not an integer"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No route is configured for the topic the message arrived on.
    UnknownTopic(String),
    /// The payload did not decode to an integer reading.
    MalformedPayload(PayloadError),
    /// The controller produced a command but publishing it failed.
    /// Controller state has already transitioned.
    Publish {
        command: ActuatorCommand,
        source: BusError,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTopic(topic) => write!(f, "unrecognized topic '{topic}'"),
            Self::MalformedPayload(e) => write!(f, "malformed payload: {e}"),
            Self::Publish { command, source } => {
                write!(f, "publishing '{}' failed: {source}", command.encode())
            }
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<PayloadError> for DispatchError {
    fn from(e: PayloadError) -> Self {
        Self::MalformedPayload(e)
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, Error>;
