//! HTTP API layer for the chat log exporter.

pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
