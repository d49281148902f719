use super::super::dto::{ApiEnvelope, MetricsResponse};
use super::super::state::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    get,
    path = "/api/metrics",
    tag = "system",
    responses((status = 200, description = "Metrics snapshot", body = MetricsResponse))
)]
pub async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ApiEnvelope<MetricsResponse>> {
    Json(ApiEnvelope::ok(MetricsResponse {
        metrics: state.metrics.snapshot(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/metrics",
    tag = "system",
    responses((status = 200, description = "Metrics reset"))
)]
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<ApiEnvelope<bool>> {
    state.metrics.reset();
    info!("Metrics reset");
    Json(ApiEnvelope::ok(true))
}
