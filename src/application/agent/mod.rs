//! The bounded reasoning loop.
//!
//! One run alternates between model turns and tool executions until the
//! model answers without tools, the model errors out, or the iteration
//! cap is reached. Tool calls within a turn run sequentially in the order
//! the model emitted them; there is no parallel tool execution.

mod prompt;

pub use prompt::operating_prompt;

use crate::application::catalog::ToolCatalog;
use crate::application::events::{names, EventBus};
use crate::application::executor::ToolExecutor;
use crate::application::federation::ExternalServerManager;
use crate::application::session::SessionStore;
use crate::config::AppConfig;
use crate::domain::types::{
    AgentMessage, ExecutionTimeline, MessageRole, OutboundToolCall, Role,
};
use crate::infrastructure::model::{ModelProvider, ModelRequest};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Messages from the session history replayed to the model each turn.
const HISTORY_WINDOW: usize = 8;
pub const DEFAULT_MAX_ITERATIONS: usize = 6;

pub type TokenCallback = Arc<dyn Fn(&str) + Send + Sync>;

pub struct AgentRunRequest {
    pub user_prompt: String,
    pub session_id: String,
    pub role: Role,
    pub allowed_tools: Option<Vec<String>>,
    pub max_iterations: usize,
    pub on_token: Option<TokenCallback>,
}

impl AgentRunRequest {
    pub fn new(user_prompt: &str, session_id: &str, role: Role) -> Self {
        Self {
            user_prompt: user_prompt.to_string(),
            session_id: session_id.to_string(),
            role,
            allowed_tools: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            on_token: None,
        }
    }
}

pub struct ReasoningAgent {
    provider: Arc<dyn ModelProvider>,
    executor: Arc<ToolExecutor>,
    federation: Arc<ExternalServerManager>,
    sessions: Arc<SessionStore>,
    events: Arc<EventBus>,
    config: AppConfig,
}

impl ReasoningAgent {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        executor: Arc<ToolExecutor>,
        federation: Arc<ExternalServerManager>,
        sessions: Arc<SessionStore>,
        events: Arc<EventBus>,
        config: AppConfig,
    ) -> Self {
        Self {
            provider,
            executor,
            federation,
            sessions,
            events,
            config,
        }
    }

    /// Drives one full reasoning run and returns its timeline.
    ///
    /// Concurrent runs on the same session serialize on the session's run
    /// lock so the history stays append-only in run order.
    pub async fn run(&self, request: AgentRunRequest) -> ExecutionTimeline {
        let run_lock = self.sessions.run_lock(&request.session_id);
        let _guard = match &run_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        info!(
            session_id = request.session_id.as_str(),
            role = request.role.as_str(),
            max_iterations = request.max_iterations,
            "Reasoning run started"
        );
        let mut timeline = ExecutionTimeline::begin(&request.session_id, &request.user_prompt);

        // Catalog tools visible to this caller, optionally narrowed further.
        let mut available = self
            .executor
            .catalog()
            .for_role(request.role, self.config.production_safe_mode);
        if let Some(allowed) = &request.allowed_tools {
            available.retain(|spec| allowed.iter().any(|name| name == &spec.name));
        }
        let mut model_tools = ToolCatalog::to_model_tools(&available);
        for tool in self.federation.all_tools().await {
            model_tools.push(json!({
                "type": "function",
                "function": {
                    "name": tool.full_name(),
                    "description": tool.description,
                    "parameters": tool.input_schema,
                }
            }));
        }

        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
        messages.push(AgentMessage::new(
            MessageRole::System,
            operating_prompt(&self.config),
        ));
        messages.extend(
            self.sessions
                .recent_messages(&request.session_id, HISTORY_WINDOW),
        );
        let user_message = AgentMessage::new(MessageRole::User, request.user_prompt.as_str());
        messages.push(user_message.clone());
        self.sessions
            .append_message(&request.session_id, user_message);

        let mut requested_calls: Vec<OutboundToolCall> = Vec::new();
        let mut final_response: Option<String> = None;

        for iteration in 1..=request.max_iterations {
            debug!(
                session_id = request.session_id.as_str(),
                iteration, "Submitting turn to model"
            );
            let outcome = match self
                .provider
                .chat(ModelRequest::new(messages.clone()).with_tools(model_tools.clone()))
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(
                        session_id = request.session_id.as_str(),
                        %err,
                        "Model call failed; terminating run"
                    );
                    self.events.publish(
                        &request.session_id,
                        names::AGENT_ERROR,
                        json!({ "error": err.user_message() }),
                    );
                    final_response = Some(format!("AI Error: {}", err.user_message()));
                    break;
                }
            };

            if !outcome.wants_tools() {
                if let Some(on_token) = &request.on_token {
                    // Lightweight streaming UX: replay the settled answer
                    // character by character.
                    for ch in outcome.content.chars() {
                        on_token(&ch.to_string());
                    }
                }
                messages.push(AgentMessage::new(
                    MessageRole::Assistant,
                    outcome.content.clone(),
                ));
                final_response = Some(outcome.content);
                break;
            }

            messages.push(
                AgentMessage::new(MessageRole::Assistant, outcome.content.clone())
                    .with_tool_calls(outcome.tool_calls.clone()),
            );

            for requested in outcome.tool_calls {
                let call = self
                    .executor
                    .execute(
                        &request.session_id,
                        &requested.name,
                        requested.arguments.clone(),
                        request.role,
                    )
                    .await;
                let content = match (&call.result, &call.error) {
                    (Some(result), _) => serde_json::to_string_pretty(result)
                        .unwrap_or_else(|_| result.to_string()),
                    (None, Some(error)) => format!("ERROR: {error}"),
                    (None, None) => "ERROR: tool produced no result".to_string(),
                };
                messages.push(AgentMessage::new(MessageRole::Tool, content));
                timeline.tool_calls.push(call);
                requested_calls.push(requested);
            }
        }

        let final_response = final_response.unwrap_or_else(|| {
            format!(
                "Completed {} tool operations. Check the execution timeline for details.",
                timeline.tool_calls.len()
            )
        });
        timeline.finish(final_response.clone());

        self.sessions.append_message(
            &request.session_id,
            AgentMessage::new(MessageRole::Assistant, final_response.clone())
                .with_tool_calls(requested_calls),
        );
        info!(
            session_id = request.session_id.as_str(),
            tool_calls = timeline.tool_calls.len(),
            duration_ms = timeline.total_duration_ms,
            "Reasoning run finished"
        );
        timeline
    }
}
