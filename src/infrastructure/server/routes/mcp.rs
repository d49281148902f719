use super::super::dto::{
    ApiEnvelope, FederatedToolView, FederatedToolsResponse, ServerListResponse,
};
use super::super::error::ApiError;
use super::super::state::AppState;
use crate::application::federation::{FederationError, NewServerConfig, ServerConfigPatch};
use crate::domain::types::ExternalServerConfig;
use axum::extract::{Path, State};
use axum::Json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

fn map_federation_error(err: FederationError) -> ApiError {
    match err {
        FederationError::UnknownServer { id } => {
            ApiError::not_found(format!("unknown server '{id}'"))
        }
        other => ApiError::internal(other.to_string()),
    }
}

#[utoipa::path(
    get,
    path = "/api/mcp/servers",
    tag = "mcp",
    responses((status = 200, description = "Configured servers with liveness", body = ServerListResponse))
)]
pub async fn list_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ApiEnvelope<ServerListResponse>> {
    Json(ApiEnvelope::ok(ServerListResponse {
        servers: state.federation.status().await,
    }))
}

#[utoipa::path(
    post,
    path = "/api/mcp/servers",
    tag = "mcp",
    request_body = NewServerConfig,
    responses((status = 200, description = "Server registered", body = ExternalServerConfig))
)]
pub async fn add_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewServerConfig>,
) -> Result<Json<ApiEnvelope<ExternalServerConfig>>, ApiError> {
    if payload.name.trim().is_empty() || payload.command.trim().is_empty() {
        return Err(ApiError::validation("name and command are required"));
    }
    let config = state
        .federation
        .add(payload)
        .await
        .map_err(map_federation_error)?;
    info!(server_id = %config.id, name = config.name.as_str(), "External server added");
    Ok(Json(ApiEnvelope::ok(config)))
}

#[utoipa::path(
    patch,
    path = "/api/mcp/servers/{id}",
    tag = "mcp",
    params(("id" = Uuid, Path, description = "Server id")),
    request_body = ServerConfigPatch,
    responses(
        (status = 200, description = "Server updated", body = ExternalServerConfig),
        (status = 404, description = "Unknown server")
    )
)]
pub async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ServerConfigPatch>,
) -> Result<Json<ApiEnvelope<ExternalServerConfig>>, ApiError> {
    let config = state
        .federation
        .update(id, payload)
        .await
        .map_err(map_federation_error)?;
    info!(server_id = %id, "External server updated");
    Ok(Json(ApiEnvelope::ok(config)))
}

#[utoipa::path(
    delete,
    path = "/api/mcp/servers/{id}",
    tag = "mcp",
    params(("id" = Uuid, Path, description = "Server id")),
    responses(
        (status = 200, description = "Server removed"),
        (status = 404, description = "Unknown server")
    )
)]
pub async fn remove_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<bool>>, ApiError> {
    let removed = state
        .federation
        .remove(id)
        .await
        .map_err(map_federation_error)?;
    if !removed {
        return Err(ApiError::not_found(format!("unknown server '{id}'")));
    }
    info!(server_id = %id, "External server removed");
    Ok(Json(ApiEnvelope::ok(true)))
}

#[utoipa::path(
    post,
    path = "/api/mcp/servers/{id}/reconnect",
    tag = "mcp",
    params(("id" = Uuid, Path, description = "Server id")),
    responses(
        (status = 200, description = "Reconnect triggered"),
        (status = 404, description = "Unknown server")
    )
)]
pub async fn reconnect_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiEnvelope<bool>>, ApiError> {
    state
        .federation
        .reconnect(id)
        .await
        .map_err(map_federation_error)?;
    info!(server_id = %id, "External server reconnect triggered");
    Ok(Json(ApiEnvelope::ok(true)))
}

#[utoipa::path(
    get,
    path = "/api/mcp/tools",
    tag = "mcp",
    responses((status = 200, description = "Federated tool list", body = FederatedToolsResponse))
)]
pub async fn tools_handler(
    State(state): State<Arc<AppState>>,
) -> Json<ApiEnvelope<FederatedToolsResponse>> {
    let tools = state
        .federation
        .all_tools()
        .await
        .into_iter()
        .map(|tool| FederatedToolView {
            full_name: tool.full_name(),
            server_id: tool.server_id.to_string(),
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        })
        .collect();
    Json(ApiEnvelope::ok(FederatedToolsResponse { tools }))
}
