//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements | Connects to                     |
//! |---------------|------------|---------------------------------|
//! | `stomp`       | BusClient  | ActiveMQ-style broker over TCP  |
//! | `memory_bus`  | BusClient  | In-process channels             |
//! | `log_sink`    | EventSink  | `log` facade                    |
//! | `json_config` | ConfigPort | JSON file on disk               |

pub mod json_config;
pub mod log_sink;
pub mod memory_bus;
pub mod stomp;
