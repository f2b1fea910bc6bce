//! Unified error types for the chat log exporter.
//!
//! Error codes:
//! - VALID_001-003: Validation errors
//! - CHAN_001: Unregistered channel
//! - STORE_001: Blob storage errors
//! - QUERY_001-005: Query service errors

use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / Invalid format
    InvalidFormat,
    /// VALID_002: Batch exceeds the event limit
    BatchTooLarge,
    /// VALID_003: Message exceeds the length limit
    MessageTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::BatchTooLarge => "VALID_002",
            Self::MessageTooLarge => "VALID_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Unified error type for the chat log exporter.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Append to a channel that was never registered with the buffer.
    #[error("unregistered channel: {0}")]
    UnregisteredChannel(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// The query service rejected a submission outright.
    #[error("query submission rejected: {0}")]
    Submission(String),

    /// The status check itself failed; the job may still be running.
    #[error("query status poll failed: {0}")]
    Poll(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("query {last_state} after {attempts} attempts, retry budget exhausted{}", .reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default())]
    RetriesExhausted {
        attempts: u32,
        last_state: String,
        reason: Option<String>,
    },

    #[error("query {query_id} did not finish within {waited:?}")]
    TimedOut { query_id: String, waited: Duration },

    #[error("publish error: {0}")]
    Publish(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unregistered_channel(channel: impl Into<String>) -> Self {
        Self::UnregisteredChannel(channel.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }

    pub fn poll(msg: impl Into<String>) -> Self {
        Self::Poll(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure is transient I/O that a later attempt may clear.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Poll(_) | Self::Publish(_))
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::Serialization(_) => 400,
            Self::UnregisteredChannel(_) => 404,
            Self::Storage(_) => 502,
            Self::Submission(_) => 502,
            Self::Poll(_) => 502,
            Self::Query(_) => 502,
            Self::RetriesExhausted { .. } => 502,
            Self::TimedOut { .. } => 504,
            Self::Publish(_) => 502,
            Self::Config(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::ValidationWithCode { code, .. } => Some(code),
            Self::UnregisteredChannel(_) => Some("CHAN_001"),
            Self::Storage(_) => Some("STORE_001"),
            Self::Submission(_) => Some("QUERY_001"),
            Self::Poll(_) => Some("QUERY_002"),
            Self::Query(_) => Some("QUERY_003"),
            Self::RetriesExhausted { .. } => Some("QUERY_004"),
            Self::TimedOut { .. } => Some("QUERY_005"),
            _ => None,
        }
    }
}
