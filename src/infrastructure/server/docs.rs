use super::dto::{
    ChatMode, ChatRequest, ChatResponse, CreateSessionRequest, FederatedToolView,
    FederatedToolsResponse, HealthResponse, MetricsResponse, PermissionsResponse,
    ServerListResponse, SessionCreatedResponse, SessionDetailResponse, SessionListResponse,
    ToolListResponse,
};
use super::routes;
use crate::application::catalog::ToolSpec;
use crate::application::federation::{NewServerConfig, ServerConfigPatch};
use crate::application::metrics::{SessionActivity, SystemMetrics, ToolMetrics};
use crate::application::session::{HistorySummary, SessionSummary};
use crate::domain::types::{
    AgentLogEntry, AgentMessage, ExecutionTimeline, ExternalServerConfig, ExternalServerStatus,
    OutboundToolCall, Plan, PlanStep, Review, Role, ToolCall, ToolCallStatus,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_handler,
        routes::chat::chat_handler,
        routes::sessions::list_handler,
        routes::sessions::create_handler,
        routes::sessions::summary_handler,
        routes::sessions::clear_handler,
        routes::tools::list_handler,
        routes::tools::permissions_handler,
        routes::metrics::snapshot_handler,
        routes::metrics::reset_handler,
        routes::mcp::list_handler,
        routes::mcp::add_handler,
        routes::mcp::update_handler,
        routes::mcp::remove_handler,
        routes::mcp::reconnect_handler,
        routes::mcp::tools_handler
    ),
    components(schemas(
        ChatMode,
        ChatRequest,
        ChatResponse,
        CreateSessionRequest,
        SessionCreatedResponse,
        SessionListResponse,
        SessionDetailResponse,
        SessionSummary,
        HistorySummary,
        HealthResponse,
        PermissionsResponse,
        MetricsResponse,
        SystemMetrics,
        ToolMetrics,
        SessionActivity,
        ToolListResponse,
        ToolSpec,
        FederatedToolView,
        FederatedToolsResponse,
        ServerListResponse,
        NewServerConfig,
        ServerConfigPatch,
        ExternalServerConfig,
        ExternalServerStatus,
        ExecutionTimeline,
        ToolCall,
        ToolCallStatus,
        AgentMessage,
        AgentLogEntry,
        OutboundToolCall,
        Plan,
        PlanStep,
        Review,
        Role
    )),
    tags(
        (name = "chat", description = "Reasoning runs"),
        (name = "sessions", description = "Session memory"),
        (name = "tools", description = "Tool catalog and permissions"),
        (name = "mcp", description = "External tool servers"),
        (name = "system", description = "Health and metrics")
    )
)]
pub(super) struct ApiDoc;
