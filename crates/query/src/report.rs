//! Report windows and formatting.

use crate::service::Row;
use chrono::{DateTime, Duration, Utc};

/// A closed time range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReportWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of `days` calendar days ending one hour before `now`.
    pub fn ending_before(now: DateTime<Utc>, days: u32) -> Self {
        let end = now - Duration::hours(1);
        let start = end - Duration::hours(24 * i64::from(days.saturating_sub(1)));
        Self { start, end }
    }

    /// Number of days the window is reported as.
    pub fn days(&self) -> i64 {
        window_days(self.start, self.end)
    }
}

/// `floor(hours(end - start) / 24) + 1`.
pub fn window_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_hours() / 24 + 1
}

/// One ranked entry of a top chatters report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatterCount {
    pub username: String,
    pub count: u64,
}

/// Parses `(message_count, username)` rows, skipping the header row.
///
/// Rows with too few cells or a non-numeric count are dropped; order is
/// preserved.
pub fn parse_top_chatters(rows: &[Row]) -> Vec<ChatterCount> {
    rows.iter()
        .skip(1)
        .filter_map(|row| match row.as_slice() {
            [count, username, ..] => count.trim().parse().ok().map(|count| ChatterCount {
                username: username.clone(),
                count,
            }),
            _ => None,
        })
        .collect()
}

/// Formats rows (header first) as a chat message. Returns `None` when there
/// are no entries.
pub fn format_top_chatters(rows: &[Row], days: i64) -> Option<String> {
    let entries = parse_top_chatters(rows);
    if entries.is_empty() {
        return None;
    }

    let ranked: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| format!("#{}: {} ({})", i + 1, e.username, e.count))
        .collect();

    Some(format!(
        "Top chatters of the last {} days: {}",
        days,
        ranked.join(", ")
    ))
}
