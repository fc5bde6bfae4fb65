//! Two-threshold (hysteresis) controller for one zone × metric pair.
//!
//! The comfort band `[min, max]` is used asymmetrically:
//!
//! ```text
//!   Disengaged ──(r < min || r > max)──▶ Engaged      emit Activate(setpoint)
//!   Engaged    ──(min < r < max)───────▶ Disengaged   emit Deactivate
//! ```
//!
//! Activation treats the band as closed, deactivation as open, so a reading
//! sitting exactly on `min` or `max` keeps an engaged actuator running.

use serde::{Deserialize, Serialize};

/// Comfort band and the setpoint commanded when correction starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    pub min: i32,
    pub max: i32,
    pub setpoint: i32,
}

impl Band {
    pub const fn new(min: i32, max: i32, setpoint: i32) -> Self {
        Self { min, max, setpoint }
    }

    /// Outside the closed band `[min, max]`.
    pub fn is_outside(&self, reading: i32) -> bool {
        reading < self.min || reading > self.max
    }

    /// Inside the open band `(min, max)`.
    pub fn is_strictly_inside(&self, reading: i32) -> bool {
        reading > self.min && reading < self.max
    }
}

/// What the controller wants the actuator to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    /// Start correcting towards the given setpoint.
    Activate(i32),
    /// Stop correcting.
    Deactivate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engagement {
    #[default]
    Disengaged,
    Engaged,
}

/// Hysteresis controller.
#[derive(Debug, Clone)]
pub struct HysteresisController {
    band: Band,
    state: Engagement,
}

impl HysteresisController {
    pub fn new(band: Band) -> Self {
        Self {
            band,
            state: Engagement::Disengaged,
        }
    }

    /// Feed one reading.  Flips the engagement state at most once and
    /// returns the actuation that goes with the flip.
    pub fn evaluate(&mut self, reading: i32) -> Option<Actuation> {
        match self.state {
            Engagement::Engaged if self.band.is_strictly_inside(reading) => {
                self.state = Engagement::Disengaged;
                Some(Actuation::Deactivate)
            }
            Engagement::Disengaged if self.band.is_outside(reading) => {
                self.state = Engagement::Engaged;
                Some(Actuation::Activate(self.band.setpoint))
            }
            _ => None,
        }
    }

    pub fn state(&self) -> Engagement {
        self.state
    }

    pub fn is_engaged(&self) -> bool {
        self.state == Engagement::Engaged
    }
}
