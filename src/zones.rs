//! Zone × metric routing.
//!
//! Single source of truth for which sensor topic feeds which controller and
//! where its commands go.  The [`RouteTable`] is built once at startup from
//! [`ControllerConfig`] and is read-only afterwards, so it can be shared
//! between listener threads behind an `Arc`.
//!
//! ```text
//!   LectIlum1 ──▶ (Office-1, Illumination) ──▶ ActIlum1
//!   LectTemp1 ──▶ (Office-1, Temperature)  ──▶ ActTemp1
//!   LectIlum2 ──▶ (Office-2, Illumination) ──▶ ActIlum2
//!   LectTemp2 ──▶ (Office-2, Temperature)  ──▶ ActTemp2
//! ```

use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::config::ControllerConfig;
use crate::control::hysteresis::Band;

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Illumination,
    Temperature,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Illumination, Metric::Temperature];

    /// Tag used in the command wire format (`"ilum:450"`).
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Illumination => "ilum",
            Self::Temperature => "temp",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.tag() == tag)
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Illumination => "lumens",
            Self::Temperature => "\u{00b0}C",
        }
    }

    /// Factory comfort band and setpoint.
    pub const fn default_band(self) -> Band {
        match self {
            Self::Illumination => Band::new(400, 500, 450),
            Self::Temperature => Band::new(19, 25, 22),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// A physical area with its own sensors and actuators, e.g. `Office-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Index of a route in its [`RouteTable`]; also indexes the controller arena.
pub type RouteId = usize;

#[derive(Debug, Clone)]
pub struct Route {
    pub zone: ZoneId,
    pub metric: Metric,
    pub sensor_topic: String,
    pub actuator_topic: String,
    pub band: Band,
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
    by_sensor: HashMap<String, RouteId>,
}

impl RouteTable {
    /// Build the table from a list of routes.  Sensor topics must be unique.
    pub fn new(routes: Vec<Route>) -> Result<Self, ConfigError> {
        let mut by_sensor = HashMap::with_capacity(routes.len());
        for (id, route) in routes.iter().enumerate() {
            if by_sensor.insert(route.sensor_topic.clone(), id).is_some() {
                return Err(ConfigError::ValidationFailed(
                    "sensor topics must be unique across zones and metrics",
                ));
            }
        }
        Ok(Self { routes, by_sensor })
    }

    /// Validate the configuration and expand every zone's topic pairs into routes.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut routes = Vec::new();
        for zone in &config.zones {
            for metric in Metric::ALL {
                if let Some(pair) = zone.topics(metric) {
                    routes.push(Route {
                        zone: ZoneId::new(zone.name.clone()),
                        metric,
                        sensor_topic: pair.sensor.clone(),
                        actuator_topic: pair.actuator.clone(),
                        band: config.band(metric),
                    });
                }
            }
        }
        Self::new(routes)
    }

    pub fn lookup(&self, sensor_topic: &str) -> Option<(RouteId, &Route)> {
        self.by_sensor
            .get(sensor_topic)
            .map(|&id| (id, &self.routes[id]))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn sensor_topics(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.sensor_topic.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
