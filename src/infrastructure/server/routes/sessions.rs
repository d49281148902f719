use super::super::dto::{
    ApiEnvelope, CreateSessionRequest, SessionCreatedResponse, SessionDetailResponse,
    SessionListResponse,
};
use super::super::error::ApiError;
use super::super::state::AppState;
use crate::domain::types::Role;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = "sessions",
    responses((status = 200, description = "All live sessions", body = SessionListResponse))
)]
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ApiEnvelope<SessionListResponse>> {
    Json(ApiEnvelope::ok(SessionListResponse {
        sessions: state.sessions.list(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionCreatedResponse),
        (status = 400, description = "Invalid role")
    )
)]
pub async fn create_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<ApiEnvelope<SessionCreatedResponse>>, ApiError> {
    let role = match payload.role.as_deref() {
        Some(raw) => Role::from_str(raw)
            .ok_or_else(|| ApiError::validation(format!("invalid role '{raw}'")))?,
        None => Role::Readonly,
    };
    let user_id = payload.user_id.unwrap_or_else(|| "anonymous".to_string());
    let session = state.sessions.create(&user_id, role);
    info!(
        session_id = session.session_id.as_str(),
        role = role.as_str(),
        "Session created"
    );
    Ok(Json(ApiEnvelope::ok(SessionCreatedResponse {
        session_id: session.session_id,
        user_id: session.user_id,
        role: session.role,
    })))
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "History summary", body = SessionDetailResponse),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiEnvelope<SessionDetailResponse>>, ApiError> {
    let summary = state
        .sessions
        .history_summary(&id)
        .ok_or_else(|| ApiError::not_found(format!("unknown session '{id}'")))?;
    Ok(Json(ApiEnvelope::ok(SessionDetailResponse {
        session_id: id,
        summary,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "sessions",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session cleared"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiEnvelope<bool>>, ApiError> {
    if !state.sessions.clear(&id) {
        return Err(ApiError::not_found(format!("unknown session '{id}'")));
    }
    state.events.remove(&id);
    info!(session_id = id.as_str(), "Session cleared");
    Ok(Json(ApiEnvelope::ok(true)))
}
