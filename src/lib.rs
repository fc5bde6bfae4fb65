//! Zone controller library.
//!
//! Central console for a building-automation testbed.  Sensor readings
//! arrive on a pub/sub bus, one hysteresis controller per zone and metric
//! decides when to switch an actuator, and commands go back out on the bus.
//! The binary wires these modules to a STOMP broker; the integration tests
//! wire them to the in-memory bus.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod backoff;
pub mod config;
pub mod control;
pub mod error;
pub mod listener;
pub mod shutdown;
pub mod supervisor;
pub mod zones;
