//! Read-only view of the estimation session.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::SnapshotEntry;
use crate::error::{ErrorResponse, HubError};

/// `GET /session` — Current participants and estimates.
///
/// The snapshot is produced by the hub task itself, so it reflects every
/// event queued before this request.
///
/// # Errors
///
/// Returns [`HubError`] if the hub has stopped.
#[utoipa::path(
    get,
    path = "/api/v1/session",
    tag = "Session",
    summary = "Current snapshot",
    description = "Returns the same array that is broadcast to WebSocket clients.",
    responses(
        (status = 200, description = "Current snapshot", body = Vec<SnapshotEntry>),
        (status = 503, description = "Hub unavailable", body = ErrorResponse),
    )
)]
pub async fn get_session(State(state): State<AppState>) -> Result<impl IntoResponse, HubError> {
    let snapshot = state.queue.snapshot().await?;
    Ok(Json(snapshot))
}

/// Session routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/session", get(get_session))
}
