//! Channel listing endpoint.

use axum::{extract::State, Json};

use crate::response::ChannelsResponse;
use crate::state::AppState;

/// GET /channels - Registered channels with pending line counts.
pub async fn channels_handler(State(state): State<AppState>) -> Json<ChannelsResponse> {
    let channels = state.buffer.pending();
    let total_pending = channels.values().sum();

    Json(ChannelsResponse {
        channels,
        total_pending,
    })
}
