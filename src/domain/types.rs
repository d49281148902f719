use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

/// Caller privilege levels, totally ordered from least to most privileged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Readonly,
    Dev,
    Operator,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Readonly => "readonly",
            Role::Dev => "dev",
            Role::Operator => "operator",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "readonly" => Some(Role::Readonly),
            "dev" => Some(Role::Dev),
            "operator" => Some(Role::Operator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Role::Readonly => 0,
            Role::Dev => 1,
            Role::Operator => 2,
            Role::Admin => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl MessageRole {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        }
    }
}

/// A tool invocation as requested by the model: the name it chose and the
/// arguments it supplied. Execution outcome lives in [`ToolCall`], not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OutboundToolCall {
    pub name: String,
    #[schema(value_type = Object)]
    pub arguments: Value,
}

/// One entry in a session's conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OutboundToolCall>>,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<OutboundToolCall>) -> Self {
        if !calls.is_empty() {
            self.tool_calls = Some(calls);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Pending,
    Running,
    Success,
    Error,
    Skipped,
}

/// Record of one executed tool call. Created and mutated only by the
/// executor; once `finished_at` is set the record is final.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ToolCall {
    pub id: Uuid,
    pub tool_name: String,
    #[schema(value_type = Object)]
    pub args: Value,
    pub status: ToolCallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl ToolCall {
    pub fn begin(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            args,
            status: ToolCallStatus::Pending,
            result: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == ToolCallStatus::Success
    }
}

/// Append-only record of one reasoning run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExecutionTimeline {
    pub session_id: String,
    pub user_prompt: String,
    pub tool_calls: Vec<ToolCall>,
    pub final_response: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub total_duration_ms: u64,
}

impl ExecutionTimeline {
    pub fn begin(session_id: &str, user_prompt: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            user_prompt: user_prompt.to_string(),
            tool_calls: Vec::new(),
            final_response: String::new(),
            started_at: Utc::now(),
            finished_at: None,
            total_duration_ms: 0,
        }
    }

    pub fn finish(&mut self, final_response: impl Into<String>) {
        let now = Utc::now();
        self.final_response = final_response.into();
        self.total_duration_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
        self.finished_at = Some(now);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanComplexity {
    Simple,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanStep {
    pub step_no: u32,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_hint: Option<String>,
    pub status: StepStatus,
}

/// Planner output: a goal restatement and an ordered list of steps.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Plan {
    pub goal: String,
    pub complexity: PlanComplexity,
    pub estimated_tools: Vec<String>,
    pub steps: Vec<PlanStep>,
}

/// Reviewer output: a verdict on the executed run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub passed: bool,
    pub score: u8,
    pub feedback: String,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Planner,
    Executor,
    Reviewer,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentLogEntry {
    pub agent: AgentKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentLogEntry {
    pub fn new(agent: AgentKind, message: impl Into<String>) -> Self {
        Self {
            agent,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The single-agent timeline augmented with the plan, the review, and the
/// per-phase log produced by the orchestrator.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MultiAgentTimeline {
    #[serde(flatten)]
    pub timeline: ExecutionTimeline,
    pub plan: Plan,
    pub review: Review,
    pub agent_logs: Vec<AgentLogEntry>,
}

/// Configuration of one external tool server, persisted as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExternalServerConfig {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: std::collections::HashMap<String, String>,
    pub enabled: bool,
}

/// Point-in-time view of an external server: its config plus liveness.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExternalServerStatus {
    #[serde(flatten)]
    pub config: ExternalServerConfig,
    pub connected: bool,
    pub tool_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
