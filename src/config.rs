//! Controller configuration.
//!
//! Broker address, per-metric thresholds, the zone → topic mapping and the
//! listener reconnect policy.  Defaults reproduce the two-office testbed;
//! a JSON file (see [`JsonFileConfig`](crate::adapters::json_config::JsonFileConfig))
//! can override any subset of fields.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::app::commands::DEACTIVATE_SENTINEL;
use crate::app::ports::ConfigError;
use crate::control::hysteresis::Band;
use crate::zones::Metric;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub broker: BrokerConfig,

    // --- Thresholds ---
    /// Illumination comfort band (lumens) and setpoint
    pub illumination: Band,
    /// Temperature comfort band (Celsius) and setpoint
    pub temperature: Band,

    // --- Topology ---
    pub zones: Vec<ZoneConfig>,

    // --- Listener recovery ---
    pub reconnect: ReconnectPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    /// STOMP port (ActiveMQ default 61613)
    pub port: u16,
    pub login: Option<String>,
    pub passcode: Option<String>,
}

/// One zone and the topics for each metric it reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illumination: Option<TopicPair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<TopicPair>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPair {
    /// Readings flow in here
    pub sensor: String,
    /// Commands flow out here
    pub actuator: String,
}

/// Exponential backoff applied when a listener's transport fails.
/// `max_attempts == 0` disables reconnection: the listener stops on the first failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    pub initial_backoff_ms: u32,
    pub max_backoff_ms: u32,
    pub max_attempts: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            illumination: Metric::Illumination.default_band(),
            temperature: Metric::Temperature.default_band(),
            zones: vec![ZoneConfig::numbered("Office-1", 1), ZoneConfig::numbered("Office-2", 2)],
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 61613,
            login: None,
            passcode: None,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// Stop on the first transport failure.
    pub const fn disabled() -> Self {
        Self {
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
            max_attempts: 0,
        }
    }
}

impl ZoneConfig {
    /// Zone using the testbed naming scheme: `LectIlum<n>` / `ActIlum<n>`,
    /// `LectTemp<n>` / `ActTemp<n>`.
    pub fn numbered(name: &str, n: u32) -> Self {
        Self {
            name: name.into(),
            illumination: Some(TopicPair {
                sensor: format!("LectIlum{n}"),
                actuator: format!("ActIlum{n}"),
            }),
            temperature: Some(TopicPair {
                sensor: format!("LectTemp{n}"),
                actuator: format!("ActTemp{n}"),
            }),
        }
    }

    pub fn topics(&self, metric: Metric) -> Option<&TopicPair> {
        match metric {
            Metric::Illumination => self.illumination.as_ref(),
            Metric::Temperature => self.temperature.as_ref(),
        }
    }
}

impl ControllerConfig {
    pub fn band(&self, metric: Metric) -> Band {
        match metric {
            Metric::Illumination => self.illumination,
            Metric::Temperature => self.temperature,
        }
    }

    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for metric in Metric::ALL {
            validate_band(self.band(metric))?;
        }

        if self.broker.host.is_empty() {
            return Err(ConfigError::ValidationFailed("broker host must not be empty"));
        }
        if self.broker.port == 0 {
            return Err(ConfigError::ValidationFailed("broker port must be non-zero"));
        }

        let mut sensors = HashSet::new();
        for zone in &self.zones {
            if zone.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed("zone name must not be empty"));
            }
            for metric in Metric::ALL {
                let Some(pair) = zone.topics(metric) else {
                    continue;
                };
                if pair.sensor.is_empty() || pair.actuator.is_empty() {
                    return Err(ConfigError::ValidationFailed("topic names must not be empty"));
                }
                if !sensors.insert(pair.sensor.as_str()) {
                    return Err(ConfigError::ValidationFailed(
                        "sensor topics must be unique across zones and metrics",
                    ));
                }
            }
        }

        if self.reconnect.initial_backoff_ms == 0 {
            return Err(ConfigError::ValidationFailed("initial_backoff_ms must be > 0"));
        }
        if self.reconnect.max_backoff_ms < self.reconnect.initial_backoff_ms {
            return Err(ConfigError::ValidationFailed(
                "max_backoff_ms must be >= initial_backoff_ms",
            ));
        }
        Ok(())
    }
}

fn validate_band(band: Band) -> Result<(), ConfigError> {
    if band.min >= band.max {
        return Err(ConfigError::ValidationFailed("band min must be below max"));
    }
    if !(band.min..=band.max).contains(&band.setpoint) {
        return Err(ConfigError::ValidationFailed("setpoint must lie within [min, max]"));
    }
    if band.setpoint == DEACTIVATE_SENTINEL {
        return Err(ConfigError::ValidationFailed(
            "setpoint collides with the deactivate sentinel",
        ));
    }
    Ok(())
}
