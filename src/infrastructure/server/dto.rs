use crate::application::metrics::SystemMetrics;
use crate::application::session::{HistorySummary, SessionSummary};
use crate::domain::types::{
    ExecutionTimeline, ExternalServerStatus, Plan, Review, Role,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Uniform response envelope for every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    #[default]
    Single,
    Multi,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    /// Role name; invalid values are rejected with 400.
    pub role: Option<String>,
    #[serde(default)]
    pub mode: ChatMode,
    pub max_iterations: Option<usize>,
    pub allowed_tools: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
    pub timeline: ExecutionTimeline,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    pub mode: ChatMode,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub user_id: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCreatedResponse {
    pub session_id: String,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionDetailResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub summary: HistorySummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub llm_available: bool,
    pub llm_models: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionsResponse {
    pub role: Role,
    pub allowed: Vec<String>,
    pub blocked: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FederatedToolView {
    pub full_name: String,
    pub server_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FederatedToolsResponse {
    pub tools: Vec<FederatedToolView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServerListResponse {
    pub servers: Vec<ExternalServerStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub metrics: SystemMetrics,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToolListResponse {
    pub role: Role,
    pub tools: Vec<crate::application::catalog::ToolSpec>,
}
