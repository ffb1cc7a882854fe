//! # Health Check Handler

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::web::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub system: String,
    pub timestamp: String,
    pub uptime_seconds: i64,
    pub pipelines: usize,
}

/// Basic health check endpoint: GET /health
///
/// Returns OK while the server is accepting connections, including during
/// graceful shutdown.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        system: state.system_name.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: state.uptime_seconds(),
        pipelines: state.pipelines.len(),
    })
}
