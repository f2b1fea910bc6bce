//! Query service seam.

use async_trait::async_trait;
use chatlog_core::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle the service returns on submission.
pub type QueryId = String;

/// One result row; NULL cells are empty strings.
pub type Row = Vec<String>;

/// Execution state reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryStatus {
    pub state: QueryState,
    /// Service-provided explanation, usually only on failure.
    pub reason: Option<String>,
}

impl QueryStatus {
    pub fn new(state: QueryState) -> Self {
        Self {
            state,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// One page of a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<Row>,
    pub next_token: Option<String>,
}

/// An asynchronous analytical query service.
///
/// Submission returns immediately with a handle; callers poll the handle
/// until it reaches a terminal state.
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submits query text. An error here means the service rejected it.
    async fn start_query(&self, query: &str) -> Result<QueryId>;

    /// Reads the current execution state.
    async fn poll_query(&self, id: &str) -> Result<QueryStatus>;

    /// Fetches one page of results of a succeeded query.
    async fn fetch_results(&self, id: &str, next_token: Option<String>) -> Result<ResultPage>;

    /// Cheap reachability check.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
