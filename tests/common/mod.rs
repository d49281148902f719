//! Shared test fixtures: a scripted model provider, recording tool
//! invokers, and a fully wired application state over in-memory parts.

use agentd::application::catalog::connectors::{InvokeError, ToolInvoker};
use agentd::application::catalog::{ToolCatalog, ToolSpec};
use agentd::application::federation::ExternalServerManager;
use agentd::config::AppConfig;
use agentd::domain::types::{OutboundToolCall, Role};
use agentd::infrastructure::model::{
    ModelError, ModelHealth, ModelOutcome, ModelProvider, ModelRequest, TokenSink,
};
use agentd::infrastructure::server::AppState;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub enum ScriptedReply {
    Outcome(ModelOutcome),
    Error(String),
}

enum Script {
    Queue(Mutex<VecDeque<ScriptedReply>>),
    Always(ModelOutcome),
}

/// Model provider that replays canned replies and records every request
/// it receives.
pub struct ScriptedProvider {
    script: Script,
    recordings: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Queue(Mutex::new(replies.into())),
            recordings: Mutex::new(Vec::new()),
        })
    }

    /// Provider that answers every turn with the same outcome.
    pub fn always(outcome: ModelOutcome) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Always(outcome),
            recordings: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.recordings.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn chat(&self, request: ModelRequest) -> Result<ModelOutcome, ModelError> {
        self.recordings.lock().unwrap().push(request);
        match &self.script {
            Script::Always(outcome) => Ok(outcome.clone()),
            Script::Queue(queue) => {
                let reply = queue
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("scripted provider ran out of replies");
                match reply {
                    ScriptedReply::Outcome(outcome) => Ok(outcome),
                    ScriptedReply::Error(message) => Err(ModelError::server(message)),
                }
            }
        }
    }

    async fn chat_stream(
        &self,
        request: ModelRequest,
        on_token: TokenSink<'_>,
    ) -> Result<String, ModelError> {
        let outcome = self.chat(request).await?;
        on_token(&outcome.content);
        Ok(outcome.content)
    }

    async fn health(&self) -> ModelHealth {
        ModelHealth {
            available: true,
            models: vec!["scripted".to_string()],
        }
    }
}

pub fn text_turn(content: &str) -> ScriptedReply {
    ScriptedReply::Outcome(ModelOutcome {
        content: content.to_string(),
        tool_calls: Vec::new(),
        done_reason: Some("stop".to_string()),
    })
}

pub fn tool_turn(calls: Vec<(&str, Value)>) -> ScriptedReply {
    ScriptedReply::Outcome(tool_outcome(calls))
}

pub fn tool_outcome(calls: Vec<(&str, Value)>) -> ModelOutcome {
    ModelOutcome {
        content: String::new(),
        tool_calls: calls
            .into_iter()
            .map(|(name, arguments)| OutboundToolCall {
                name: name.to_string(),
                arguments,
            })
            .collect(),
        done_reason: Some("tool_calls".to_string()),
    }
}

/// Invoker that records its invocations and returns a fixed result.
pub struct RecordingInvoker {
    pub calls: Arc<Mutex<Vec<Value>>>,
    result: Value,
}

impl RecordingInvoker {
    pub fn new(result: Value) -> (Arc<Self>, Arc<Mutex<Vec<Value>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                calls: calls.clone(),
                result,
            }),
            calls,
        )
    }
}

#[async_trait]
impl ToolInvoker for RecordingInvoker {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError> {
        self.calls.lock().unwrap().push(args);
        Ok(self.result.clone())
    }
}

pub struct FailingInvoker {
    message: String,
}

impl FailingInvoker {
    pub fn new(message: &str) -> Arc<Self> {
        Arc::new(Self {
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl ToolInvoker for FailingInvoker {
    async fn invoke(&self, _args: Value) -> Result<Value, InvokeError> {
        Err(InvokeError::message(self.message.clone()))
    }
}

pub fn spec(name: &str, roles: Vec<Role>, safe: bool) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: format!("test tool {name}"),
        input_schema: json!({ "type": "object", "properties": {}, "required": [] }),
        required_roles: roles,
        safe_for_production: safe,
    }
}

pub fn all_roles() -> Vec<Role> {
    vec![Role::Readonly, Role::Dev, Role::Operator, Role::Admin]
}

pub struct Harness {
    pub state: Arc<AppState>,
    // Keeps the servers file directory alive for the test's duration.
    _dir: tempfile::TempDir,
}

/// Wires a full application state around the given provider and catalog
/// entries, with federation persistence in a temp directory.
pub async fn harness(
    provider: Arc<dyn ModelProvider>,
    tools: Vec<(ToolSpec, Arc<dyn ToolInvoker>)>,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::from_lookup(|_| None);
    config.servers_file = dir.path().join("mcp-servers.json");
    config.fs_allowed_path = dir.path().to_path_buf();

    let catalog = Arc::new(ToolCatalog::with_tools(tools));
    let federation = Arc::new(
        ExternalServerManager::load(config.servers_file.clone())
            .await
            .unwrap(),
    );
    let state = AppState::assemble(config, provider, catalog, federation);
    Harness { state, _dir: dir }
}
