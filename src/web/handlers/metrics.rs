//! Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use prometheus::{Encoder, TextEncoder};

use crate::web::errors::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Render the crate-owned registry: GET /metrics
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let registry = state.registry.as_ref().ok_or(ApiError::MetricsUnavailable)?;

    let encoder = TextEncoder::new();
    let body = encoder
        .encode_to_string(&registry.gather())
        .map_err(|e| ApiError::internal(format!("encoding metrics: {e}")))?;

    Ok(([(header::CONTENT_TYPE, encoder.format_type().to_string())], body))
}
