//! Shared helpers for the chat log exporter integration tests.
//!
//! Everything runs in-process: blob storage is an in-memory object store and
//! the query service and chat publisher are scripted mocks.

pub mod fixtures;
pub mod setup;
