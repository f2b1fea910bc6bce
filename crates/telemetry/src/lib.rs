//! Internal telemetry for the chat log exporter.
//!
//! Metrics live in-process and are logged periodically by the worker
//! scheduler; health is tracked per external dependency.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
