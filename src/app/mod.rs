//! Application core: pure domain logic, zero I/O.
//!
//! Topic routing, hysteresis decisions and command encoding.  All
//! interaction with the broker, the log and config storage happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! with an in-process bus.

pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod ports;
