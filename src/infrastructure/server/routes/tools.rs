use super::super::dto::{ApiEnvelope, PermissionsResponse, ToolListResponse};
use super::super::error::ApiError;
use super::super::state::AppState;
use crate::config::role_for_token;
use crate::domain::types::Role;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;

pub(crate) fn bearer_role(headers: &HeaderMap) -> Role {
    let token = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    role_for_token(token)
}

#[utoipa::path(
    get,
    path = "/api/tools",
    tag = "tools",
    responses((status = 200, description = "Catalog filtered by the caller's role", body = ToolListResponse))
)]
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<ApiEnvelope<ToolListResponse>> {
    let role = bearer_role(&headers);
    let tools = state
        .catalog
        .for_role(role, state.config.production_safe_mode);
    Json(ApiEnvelope::ok(ToolListResponse { role, tools }))
}

#[utoipa::path(
    get,
    path = "/api/permissions/{role}",
    tag = "tools",
    params(("role" = String, Path, description = "Role name")),
    responses(
        (status = 200, description = "Allowed and blocked tool names", body = PermissionsResponse),
        (status = 400, description = "Invalid role")
    )
)]
pub async fn permissions_handler(
    State(state): State<Arc<AppState>>,
    Path(raw_role): Path<String>,
) -> Result<Json<ApiEnvelope<PermissionsResponse>>, ApiError> {
    let role = Role::from_str(&raw_role)
        .ok_or_else(|| ApiError::validation(format!("invalid role '{raw_role}'")))?;
    let safe_mode = state.config.production_safe_mode;
    let mut allowed = Vec::new();
    let mut blocked = Vec::new();
    for spec in state.catalog.all() {
        let permitted =
            spec.required_roles.contains(&role) && (!safe_mode || spec.safe_for_production);
        if permitted {
            allowed.push(spec.name.clone());
        } else {
            blocked.push(spec.name.clone());
        }
    }
    Ok(Json(ApiEnvelope::ok(PermissionsResponse {
        role,
        allowed,
        blocked,
    })))
}
