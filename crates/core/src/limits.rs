//! Size limits for ingested chat events.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Batch Limits ===

/// Maximum ingest payload size in bytes (1MB).
pub const MAX_BATCH_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum events per ingest request.
pub const MAX_BATCH_EVENTS: usize = 1000;

// === String Field Limits (chars) ===

/// Chat message max length.
/// Twitch caps messages at 500 characters; leave room for other networks.
pub const MAX_MESSAGE_LEN: usize = 2000;

/// Username max length.
pub const MAX_USERNAME_LEN: usize = 64;

/// Channel name max length (Twitch logins are at most 25 chars).
pub const MAX_CHANNEL_LEN: usize = 25;

// === Report Limits ===

/// Default number of entries in a top chatters report.
pub const DEFAULT_TOP_N: u32 = 10;
