//! Model types - request, response, and error shapes for the LLM backend.

use crate::domain::types::{AgentMessage, OutboundToolCall};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// One chat round-trip to the model backend.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub messages: Vec<AgentMessage>,
    /// Tool descriptors in the wire shape the backend expects.
    pub tools: Vec<Value>,
}

impl ModelRequest {
    pub fn new(messages: Vec<AgentMessage>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
        }
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }
}

/// The assistant turn the backend produced.
#[derive(Debug, Clone)]
pub struct ModelOutcome {
    pub content: String,
    pub tool_calls: Vec<OutboundToolCall>,
    pub done_reason: Option<String>,
}

impl ModelOutcome {
    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Liveness report for the backend.
#[derive(Debug, Clone)]
pub struct ModelHealth {
    pub available: bool,
    pub models: Vec<String>,
}

/// Model backend errors. Transport and server failures are kept apart so
/// the reasoning loop can surface them distinctly.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("transport error reaching model backend: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },
    #[error("model backend returned an error: {message}")]
    Server { message: String },
    #[error("model backend returned invalid response: {reason}")]
    InvalidResponse { reason: String },
}

impl ModelError {
    pub fn transport(source: reqwest::Error) -> Self {
        Self::Transport { source }
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::Server {
            message: message.into(),
        }
    }

    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Short message suitable for embedding in a chat response.
    pub fn user_message(&self) -> String {
        match self {
            ModelError::Transport { source } => {
                if source.is_connect() {
                    "cannot reach the model backend".to_string()
                } else if source.is_timeout() {
                    "model request timed out".to_string()
                } else if let Some(status) = source.status() {
                    match status {
                        StatusCode::NOT_FOUND => "model endpoint not found".to_string(),
                        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                            "model backend is unavailable".to_string()
                        }
                        _ => format!("model request failed with status {}", status.as_u16()),
                    }
                } else {
                    "network error reaching the model backend".to_string()
                }
            }
            ModelError::Server { message } => message.clone(),
            ModelError::InvalidResponse { reason } => {
                format!("model returned an unusable response: {reason}")
            }
        }
    }
}
