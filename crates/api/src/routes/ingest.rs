//! Ingestion endpoint handler.
//!
//! Accepts parsed chat events in 3 formats:
//! 1. Array: `[event, event, ...]`
//! 2. Object with events: `{ "events": [...] }`
//! 3. Single event: `{ "channel": "...", "username": "...", "message": "..." }`
//!
//! Each accepted event is serialized into a log line and appended to its
//! channel's buffer.

use axum::{body::Bytes, extract::State, Json};
use chatlog_core::{
    limits::{MAX_BATCH_EVENTS, MAX_BATCH_SIZE_BYTES},
    prepare_batch, to_line, ChatPayload, Error, ValidationErrorCode,
};
use telemetry::metrics;
use tracing::{debug, error, info, warn};

use crate::response::{ApiError, IngestResponse};
use crate::state::AppState;

/// POST /events - Chat event ingestion.
///
/// Rejected events are listed in `errors`; the rest are buffered.
pub async fn ingest_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<IngestResponse>, ApiError> {
    metrics().ingest_requests.inc();

    if body.len() > MAX_BATCH_SIZE_BYTES {
        return Err(ApiError::validation(
            ValidationErrorCode::BatchTooLarge.code(),
            vec![format!(
                "Payload size {}KB exceeds {}KB limit",
                body.len() / 1024,
                MAX_BATCH_SIZE_BYTES / 1024
            )],
        ));
    }

    let payload = ChatPayload::parse(&body).map_err(|e| {
        error!(error = %e, "Failed to parse chat payload");
        ApiError::bad_request(e.to_string())
    })?;

    let total_events = payload.events.len();
    metrics().events_received.inc_by(total_events as u64);
    debug!(events = total_events, payload_size = body.len(), "Received event batch");

    if total_events > MAX_BATCH_EVENTS {
        return Err(ApiError::validation(
            ValidationErrorCode::BatchTooLarge.code(),
            vec![format!(
                "Batch has {} events, exceeds {} limit",
                total_events, MAX_BATCH_EVENTS
            )],
        ));
    }

    let (events, mut errors) = prepare_batch(payload.events);

    let mut accepted = 0;
    for event in events {
        let appended = to_line(&event).and_then(|line| state.buffer.append(&event.channel, line));
        match appended {
            Ok(()) => accepted += 1,
            Err(e @ Error::UnregisteredChannel(_)) => {
                warn!(channel = %event.channel, "Event for unregistered channel");
                errors.push(e);
            }
            Err(e) => errors.push(e),
        }
    }

    let rejected = errors.len();
    metrics().events_buffered.inc_by(accepted as u64);
    if rejected > 0 {
        metrics().events_rejected.inc_by(rejected as u64);
        warn!(accepted = accepted, rejected = rejected, "Some events were rejected");
    }

    info!(accepted = accepted, rejected = rejected, "Batch buffered");

    let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
    Ok(Json(IngestResponse::partial(accepted, messages)))
}
