//! Partition keys and blob key layout.
//!
//! Stored logs are laid out Hive-style so the query service can map
//! `channel=<c>/date_string=<d>/` prefixes onto table partitions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Date format used in keys and partition values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identifies one registered partition: a channel on a calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionKey {
    pub channel: String,
    pub date: NaiveDate,
}

impl PartitionKey {
    pub fn new(channel: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            channel: channel.into(),
            date,
        }
    }

    /// Partition for a channel on the UTC day containing `at`.
    pub fn for_time(channel: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self::new(channel, at.date_naive())
    }

    /// `YYYY-MM-DD`.
    pub fn date_string(&self) -> String {
        date_string(self.date)
    }

    /// `channel=<c>/date_string=<d>` without a trailing slash.
    pub fn prefix(&self) -> String {
        format!("channel={}/date_string={}", self.channel, self.date_string())
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.channel, self.date_string())
    }
}

pub fn date_string(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Unique object name component: sortable UTC timestamp plus a random suffix.
pub fn unique_token(at: DateTime<Utc>) -> String {
    format!(
        "{}-{}",
        at.format("%Y%m%dT%H%M%S%.6fZ"),
        Uuid::new_v4().simple()
    )
}

/// Full blob key for a channel batch uploaded at `at`.
///
/// `[<prefix>/]channel=<c>/date_string=<YYYY-MM-DD>/<token>.log`
pub fn blob_key(prefix: Option<&str>, channel: &str, at: DateTime<Utc>) -> String {
    let partition = PartitionKey::for_time(channel, at);
    let relative = format!("{}/{}.log", partition.prefix(), unique_token(at));

    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(p) => format!("{}/{}", p, relative),
        None => relative,
    }
}
