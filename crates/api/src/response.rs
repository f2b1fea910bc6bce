//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response for `POST /events`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub received: usize,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl IngestResponse {
    pub fn success(received: usize) -> Self {
        Self {
            success: true,
            received,
            timestamp: chrono::Utc::now().timestamp_millis(),
            errors: None,
        }
    }

    pub fn partial(received: usize, errors: Vec<String>) -> Self {
        Self {
            success: true,
            received,
            timestamp: chrono::Utc::now().timestamp_millis(),
            errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub blob_store_connected: bool,
    pub query_service_connected: bool,
    pub buffered_lines: usize,
}

/// Response for `GET /channels`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelsResponse {
    /// Pending line count per registered channel
    pub channels: BTreeMap<String, usize>,
    pub total_pending: usize,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error type with error codes.
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_001", msg)
    }

    pub fn validation(code: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            response: ErrorResponse::new("Validation failed", code).with_details(errors),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<chatlog_core::Error> for ApiError {
    fn from(err: chatlog_core::Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        match &err {
            chatlog_core::Error::ValidationWithCode { code, message, .. } => {
                ApiError::validation(*code, vec![message.clone()])
            }
            chatlog_core::Error::Validation(msg) => ApiError::bad_request(msg),
            _ => {
                let code = err.error_code().unwrap_or("INTERNAL_001");
                ApiError::with_code(status, code, err.to_string())
            }
        }
    }
}
