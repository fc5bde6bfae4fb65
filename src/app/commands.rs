//! Outbound actuator commands and their wire encoding.
//!
//! Internally a command is a tagged [`Actuation`]; the `-1` "deactivate"
//! sentinel only exists in [`ActuatorCommand::encode`] and the [`FromStr`]
//! decoder used by office-side consumers.
//!
//! ```text
//!   Activate(450) on Illumination  ──▶  "ilum:450"
//!   Deactivate    on Temperature   ──▶  "temp:-1"
//! ```

use core::fmt::{self, Write};
use core::str::FromStr;

use crate::control::hysteresis::Actuation;
use crate::zones::Metric;

/// Wire value meaning "stop correcting".
pub const DEACTIVATE_SENTINEL: i32 = -1;

/// `"temp:-2147483648"` is the longest possible payload (16 bytes).
pub type CommandPayload = heapless::String<24>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub metric: Metric,
    pub actuation: Actuation,
}

impl ActuatorCommand {
    pub const fn new(metric: Metric, actuation: Actuation) -> Self {
        Self { metric, actuation }
    }

    pub const fn activate(metric: Metric, setpoint: i32) -> Self {
        Self::new(metric, Actuation::Activate(setpoint))
    }

    pub const fn deactivate(metric: Metric) -> Self {
        Self::new(metric, Actuation::Deactivate)
    }

    /// Encode as `"<tag>:<value>"`.
    pub fn encode(&self) -> CommandPayload {
        let value = match self.actuation {
            Actuation::Activate(setpoint) => setpoint,
            Actuation::Deactivate => DEACTIVATE_SENTINEL,
        };
        let mut out = CommandPayload::new();
        // Capacity covers every i32, so this cannot overflow.
        let _ = write!(out, "{}:{}", self.metric.tag(), value);
        out
    }
}

impl fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandParseError {
    /// No `:` separating tag and value.
    MissingSeparator,
    UnknownMetric,
    InvalidValue,
}

impl fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator => write!(f, "expected '<tag>:<value>'"),
            Self::UnknownMetric => write!(f, "unknown metric tag"),
            Self::InvalidValue => write!(f, "value is not an integer"),
        }
    }
}

impl FromStr for ActuatorCommand {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, value) = s
            .trim()
            .split_once(':')
            .ok_or(CommandParseError::MissingSeparator)?;
        let metric = Metric::from_tag(tag).ok_or(CommandParseError::UnknownMetric)?;
        let value: i32 = value
            .parse()
            .map_err(|_| CommandParseError::InvalidValue)?;
        let actuation = if value == DEACTIVATE_SENTINEL {
            Actuation::Deactivate
        } else {
            Actuation::Activate(value)
        };
        Ok(Self { metric, actuation })
    }
}
