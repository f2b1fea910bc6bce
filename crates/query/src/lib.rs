//! Asynchronous analytical query execution for the chat log exporter.
//!
//! Queries are submitted to a [`QueryService`], polled until they reach a
//! terminal state, and resubmitted on failure within a retry budget.

pub mod athena;
pub mod config;
pub mod executor;
pub mod health;
pub mod report;
pub mod service;
pub mod templates;

pub use athena::AthenaQueryService;
pub use config::*;
pub use executor::*;
pub use report::*;
pub use service::*;
pub use templates::*;
