//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the in-memory bus and a recording event sink.  No broker is
//! required.

mod dispatcher_tests;
mod mock_bus;
mod supervisor_tests;
