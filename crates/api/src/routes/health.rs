//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub workflows: usize,
}

/// GET /health: liveness plus the number of registered workflows.
pub async fn check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.shutdown.is_cancelled() {
            "shutting_down"
        } else {
            "ok"
        },
        workflows: state.engine.list_workflows().len(),
    })
}
