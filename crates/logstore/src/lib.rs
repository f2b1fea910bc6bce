//! Per-channel log buffering and blob storage upload.
//!
//! The [`ChannelBuffer`] collects serialized lines per channel between
//! flushes; a [`LogSink`] turns one drained channel batch into one object.

pub mod buffer;
pub mod config;
pub mod health;
pub mod store;
pub mod writer;

pub use buffer::*;
pub use config::*;
pub use store::*;
pub use writer::*;
