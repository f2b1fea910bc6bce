//! Query service configuration.

use chatlog_core::limits::DEFAULT_TOP_N;
use chatlog_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Query service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// AWS region; falls back to the SDK's region chain when unset
    #[serde(default)]
    pub region: Option<String>,
    /// Database holding the chat log table
    #[serde(default = "default_database")]
    pub database: String,
    /// Table name
    #[serde(default = "default_table")]
    pub table: String,
    /// Where the service writes query results (`s3://bucket/path/`)
    #[serde(default)]
    pub output_location: String,
    /// Workgroup (optional)
    #[serde(default)]
    pub workgroup: Option<String>,
    /// Table root; when set, partitions are registered with explicit locations
    #[serde(default)]
    pub table_location: Option<String>,
    /// Status poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Client-side wait limit per submission in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Resubmissions allowed after a failed or cancelled run
    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,
    /// Entries per top chatters report
    #[serde(default = "default_top_n")]
    pub top_n: u32,
}

fn default_database() -> String {
    "chatlogs".to_string()
}

fn default_table() -> String {
    "messages".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_retry_budget() -> u32 {
    3
}

fn default_top_n() -> u32 {
    DEFAULT_TOP_N
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            region: None,
            database: default_database(),
            table: default_table(),
            output_location: String::new(),
            workgroup: None,
            table_location: None,
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
            retry_budget: default_retry_budget(),
            top_n: default_top_n(),
        }
    }
}

impl QueryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Checks the values the query service cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() || self.table.trim().is_empty() {
            return Err(Error::config("query.database and query.table are required"));
        }
        if self.output_location.trim().is_empty() && self.workgroup.is_none() {
            return Err(Error::config(
                "query.output_location is required unless a workgroup supplies one",
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::config("query.poll_interval_ms must be positive"));
        }
        if self.top_n == 0 {
            return Err(Error::config("query.top_n must be positive"));
        }
        Ok(())
    }
}
