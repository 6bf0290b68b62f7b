use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::services::monitor::summary::load_summary;
use crate::AppState;

/// Handler for GET /api/status
/// Public status overview built from monitors and their recent heartbeats
pub async fn get_status(State(state): State<Arc<AppState>>) -> Response {
    match load_summary(state.store.as_ref()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to build status summary");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": "status unavailable" })),
            )
                .into_response()
        }
    }
}
