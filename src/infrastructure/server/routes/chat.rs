use super::super::dto::{ApiEnvelope, ChatMode, ChatRequest, ChatResponse};
use super::super::error::ApiError;
use super::super::state::AppState;
use crate::application::agent::{AgentRunRequest, DEFAULT_MAX_ITERATIONS};
use crate::application::events::names;
use crate::domain::types::Role;
use axum::extract::State;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Run completed", body = ChatResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ApiEnvelope<ChatResponse>>, ApiError> {
    if payload.message.trim().is_empty() {
        error!("Rejecting chat request with empty message");
        return Err(ApiError::validation("message cannot be empty"));
    }
    let role = match payload.role.as_deref() {
        Some(raw) => Role::from_str(raw)
            .ok_or_else(|| ApiError::validation(format!("invalid role '{raw}'")))?,
        None => Role::Readonly,
    };
    let user_id = payload.user_id.unwrap_or_else(|| "anonymous".to_string());

    let session = state
        .sessions
        .get_or_create(payload.session_id.as_deref(), &user_id, role);
    info!(
        session_id = session.session_id.as_str(),
        mode = ?payload.mode,
        role = session.role.as_str(),
        "Received chat request"
    );
    state.metrics.record_request(&session.session_id);
    state.events.publish(
        &session.session_id,
        names::AGENT_START,
        json!({ "mode": payload.mode, "user_id": user_id }),
    );

    let mut run = AgentRunRequest::new(&payload.message, &session.session_id, session.role);
    run.max_iterations = payload.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
    run.allowed_tools = payload.allowed_tools;

    let response = match payload.mode {
        ChatMode::Single => {
            let timeline = state.agent.run(run).await;
            ChatResponse {
                session_id: session.session_id.clone(),
                response: timeline.final_response.clone(),
                timeline,
                plan: None,
                review: None,
                mode: ChatMode::Single,
            }
        }
        ChatMode::Multi => {
            let multi = state.orchestrator.run(run).await;
            ChatResponse {
                session_id: session.session_id.clone(),
                response: multi.timeline.final_response.clone(),
                timeline: multi.timeline,
                plan: Some(multi.plan),
                review: Some(multi.review),
                mode: ChatMode::Multi,
            }
        }
    };

    state.events.publish(
        &session.session_id,
        names::AGENT_DONE,
        json!({
            "final_response": &response.response,
            "tool_calls": response.timeline.tool_calls.len(),
        }),
    );
    Ok(Json(ApiEnvelope::ok(response)))
}
