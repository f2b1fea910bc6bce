//! Chat event types and ingest payload parsing.
//!
//! This module handles:
//! - Parsing ingest payloads (array, object with events, single event)
//! - Normalizing channel names
//! - Validating required fields and size limits

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use validator::Validate;

use crate::error::{Error, Result, ValidationErrorCode};
use crate::limits::{MAX_CHANNEL_LEN, MAX_MESSAGE_LEN};

/// Channel names after normalization: lowercase login characters only.
static CHANNEL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]{1,25}$").expect("valid channel regex"));

/// One parsed chat message as delivered by the chat client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ChatEvent {
    /// Channel the message was sent to (with or without a leading `#`).
    pub channel: String,
    /// Author login name.
    #[validate(length(min = 1, max = 64))]
    pub username: String,
    /// Message text.
    #[validate(length(max = 2000))]
    pub message: String,
    /// Time the chat server stamped the message. Defaults to receipt time.
    #[serde(default = "default_timestamp")]
    pub timestamp: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl ChatEvent {
    pub fn new(
        channel: impl Into<String>,
        username: impl Into<String>,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            channel: channel.into(),
            username: username.into(),
            message: message.into(),
            timestamp,
        }
    }

    /// Returns a copy with the channel name normalized.
    pub fn normalized(mut self) -> Self {
        self.channel = normalize_channel(&self.channel);
        self
    }
}

/// Normalizes a channel name: trims, strips a leading `#`, lowercases.
pub fn normalize_channel(channel: &str) -> String {
    channel.trim().trim_start_matches('#').to_lowercase()
}

/// Checks that a normalized channel name is usable as a partition value.
pub fn validate_channel_name(channel: &str) -> Result<()> {
    if channel.is_empty() {
        return Err(Error::validation("channel is required"));
    }
    if channel.len() > MAX_CHANNEL_LEN {
        return Err(Error::validation(format!(
            "channel exceeds {} characters",
            MAX_CHANNEL_LEN
        )));
    }
    if !CHANNEL_NAME.is_match(channel) {
        return Err(Error::validation(format!(
            "channel '{}' may only contain a-z, 0-9 and _",
            channel
        )));
    }
    Ok(())
}

/// Validate a chat event (expects a normalized channel).
pub fn validate_chat_event(event: &ChatEvent) -> Result<()> {
    if event.message.chars().count() > MAX_MESSAGE_LEN {
        return Err(Error::validation_code(
            ValidationErrorCode::MessageTooLarge,
            format!("message exceeds {} characters", MAX_MESSAGE_LEN),
        ));
    }

    event
        .validate()
        .map_err(|e| Error::validation(format!("{}", e)))?;

    validate_channel_name(&event.channel)?;

    if event.username.trim().is_empty() {
        return Err(Error::validation("username is required"));
    }

    Ok(())
}

/// Parsed ingest payload (supports 3 formats).
#[derive(Debug, Clone)]
pub struct ChatPayload {
    pub events: Vec<ChatEvent>,
}

impl ChatPayload {
    /// Parse an ingest payload from JSON bytes.
    /// Supports:
    /// 1. Array: `[event, event, ...]`
    /// 2. Object with events: `{ "events": [...] }`
    /// 3. Single event: `{ "channel": "...", "username": "...", "message": "..." }`
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::validation(format!("invalid JSON: {}", e)))?;

        match &value {
            Value::Array(_) => {
                let events: Vec<ChatEvent> = serde_json::from_value(value)
                    .map_err(|e| Error::validation(format!("invalid event array: {}", e)))?;
                Ok(Self { events })
            }

            Value::Object(obj) => {
                if obj.contains_key("events") {
                    #[derive(Deserialize)]
                    struct Wrapper {
                        events: Vec<ChatEvent>,
                    }
                    let wrapper: Wrapper = serde_json::from_value(value)
                        .map_err(|e| Error::validation(format!("invalid batch object: {}", e)))?;
                    Ok(Self {
                        events: wrapper.events,
                    })
                } else if obj.contains_key("channel") && obj.contains_key("message") {
                    let event: ChatEvent = serde_json::from_value(value)
                        .map_err(|e| Error::validation(format!("invalid single event: {}", e)))?;
                    Ok(Self {
                        events: vec![event],
                    })
                } else {
                    Err(Error::validation(
                        "object must have 'events' array or be a single event with 'channel' and 'message'",
                    ))
                }
            }

            _ => Err(Error::validation(
                "request body must be an array of events or an object",
            )),
        }
    }
}

/// Normalize and validate a batch of chat events.
///
/// Returns the accepted events and one error per rejected event.
pub fn prepare_batch(events: Vec<ChatEvent>) -> (Vec<ChatEvent>, Vec<Error>) {
    let mut accepted = Vec::with_capacity(events.len());
    let mut errors = Vec::new();

    for (i, event) in events.into_iter().enumerate() {
        let event = event.normalized();
        match validate_chat_event(&event) {
            Ok(()) => accepted.push(event),
            Err(e) => errors.push(Error::validation(format!("event[{}]: {}", i, e))),
        }
    }

    (accepted, errors)
}
