//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] covers everything a producer or REST caller can observe
//! from the hub. [`WriteError`] is the per-connection outbound failure the
//! broadcaster turns into an eviction. Neither is ever fatal to the process.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 3001,
///     "message": "event queue closed"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Errors surfaced by the event queue, the hub, and frame decoding.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Decoding   | 400 Bad Request             |
/// | 3000–3999 | Hub        | 503 Service Unavailable     |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The hub task has stopped and the queue no longer accepts messages.
    #[error("event queue closed")]
    QueueClosed,

    /// The queue stayed full for longer than the enqueue timeout.
    #[error("event queue full; gave up after {timeout_ms} ms")]
    QueueFull {
        /// How long the producer waited before dropping the event.
        timeout_ms: u64,
    },

    /// An inbound frame could not be turned into an event.
    #[error("malformed frame: {0}")]
    Decode(String),

    /// The hub accepted a request but dropped the reply.
    #[error("hub unavailable: {0}")]
    Unavailable(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Decode(_) => 1001,
            Self::QueueClosed => 3001,
            Self::QueueFull { .. } => 3002,
            Self::Unavailable(_) => 3003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::QueueClosed | Self::QueueFull { .. } | Self::Unavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

/// Failure to hand a snapshot to one connection's writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WriteError {
    /// The connection's writer has gone away.
    #[error("connection closed")]
    Closed,

    /// The connection has too many unsent snapshots queued.
    #[error("connection outbound buffer full")]
    Backlogged,
}
