//! Canonical log line encoding.
//!
//! One chat event becomes one single-line JSON record. Field order is fixed
//! and timestamps are RFC 3339 UTC with millisecond precision, so lines sort
//! by time within a channel and stay stable across releases.

use chrono::SecondsFormat;
use serde::Serialize;
use std::fmt;

use crate::error::Result;
use crate::events::ChatEvent;

/// A single serialized chat event. Never contains a newline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogLine(String);

impl LogLine {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogLine {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// On-disk record layout. Column names match the query service table.
#[derive(Serialize)]
struct LogRecord<'a> {
    message: &'a str,
    time: String,
    username: &'a str,
    channel: &'a str,
}

/// Serialize one chat event into its log line.
pub fn to_line(event: &ChatEvent) -> Result<LogLine> {
    let record = LogRecord {
        message: &event.message,
        time: event.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        username: &event.username,
        channel: &event.channel,
    };
    // serde_json escapes control characters, so embedded newlines stay escaped.
    Ok(LogLine(serde_json::to_string(&record)?))
}

/// Joins lines into a newline-terminated blob body.
pub fn encode_lines(lines: &[LogLine]) -> Vec<u8> {
    let capacity = lines.iter().map(|l| l.len() + 1).sum();
    let mut out = Vec::with_capacity(capacity);
    for line in lines {
        out.extend_from_slice(line.as_str().as_bytes());
        out.push(b'\n');
    }
    out
}
