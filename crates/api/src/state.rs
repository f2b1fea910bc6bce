//! Application state shared across handlers.

use logstore::ChannelBuffer;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Per-channel line buffer drained by the flush worker
    pub buffer: Arc<ChannelBuffer>,
}

impl AppState {
    pub fn new(buffer: Arc<ChannelBuffer>) -> Self {
        Self { buffer }
    }
}
