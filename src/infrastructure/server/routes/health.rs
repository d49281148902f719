use super::super::dto::{ApiEnvelope, HealthResponse};
use super::super::state::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses((status = 200, description = "Service liveness and LLM health", body = HealthResponse))
)]
pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ApiEnvelope<HealthResponse>> {
    let health = state.provider.health().await;
    Json(ApiEnvelope::ok(HealthResponse {
        status: "ok",
        llm_available: health.available,
        llm_models: health.models,
    }))
}
