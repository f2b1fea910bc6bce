//! Test fixtures and event generators.

use chatlog_core::{to_line, ChatEvent, LogLine};
use chrono::{DateTime, TimeZone, Utc};

/// Channels every test context registers.
pub const CHANNELS: [&str; 2] = ["jinnytty", "haruiswaifu"];

/// A fixed instant: Thursday 2024-03-07 12:00:00 UTC.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// A chat event JSON value.
pub fn chat_event(channel: &str, username: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "channel": channel,
        "username": username,
        "message": message,
        "timestamp": Utc::now().to_rfc3339()
    })
}

/// N events for one channel from rotating users.
pub fn chat_events(channel: &str, n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| chat_event(channel, &format!("user{}", i % 3), &format!("message {}", i)))
        .collect()
}

/// Generate array format payload.
pub fn array_payload(events: Vec<serde_json::Value>) -> String {
    serde_json::Value::Array(events).to_string()
}

/// Generate object format payload.
pub fn object_payload(events: Vec<serde_json::Value>) -> String {
    serde_json::json!({ "events": events }).to_string()
}

/// Generate single event payload.
pub fn single_payload(event: serde_json::Value) -> String {
    event.to_string()
}

/// Generate a batch that exceeds the event limit.
pub fn oversized_batch() -> Vec<serde_json::Value> {
    chat_events("jinnytty", 1001)
}

/// A serialized line for direct buffer appends.
pub fn log_line(channel: &str, message: &str) -> LogLine {
    let event = ChatEvent::new(channel, "alice", message, fixed_time());
    to_line(&event).unwrap_or_else(|e| panic!("fixture event must serialize: {}", e))
}

/// Result rows as the query service returns them, header first.
pub fn top_chatter_rows(entries: &[(&str, u64)]) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["message_count".to_string(), "username".to_string()]];
    rows.extend(
        entries
            .iter()
            .map(|(user, count)| vec![count.to_string(), user.to_string()]),
    );
    rows
}
