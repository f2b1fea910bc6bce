//! Background workers for the chat log exporter.
//!
//! Handles the periodic jobs:
//! - Flush (channel buffers → blob storage)
//! - Partitions (register today's partitions with the query service)
//! - Reports (top chatters per channel, published back to chat)
//! - Metrics logging and health refresh

pub mod flush;
pub mod partitions;
pub mod publisher;
pub mod reports;
pub mod schedule;
pub mod scheduler;

pub use flush::*;
pub use partitions::*;
pub use publisher::*;
pub use reports::*;
pub use schedule::*;
pub use scheduler::*;
