//! Ollama client implementation.

use super::traits::{ModelProvider, TokenSink};
use super::types::{ModelError, ModelHealth, ModelOutcome, ModelRequest};
use crate::config::LlmConfig;
use crate::domain::types::{AgentMessage, OutboundToolCall};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Client for a local Ollama backend.
///
/// Timeout, temperature, and context window come from configuration, not
/// per-call. The client never retries; the reasoning loop decides policy.
#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    temperature: f64,
    context_length: u32,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            context_length: config.context_length,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn payload(&self, request: &ModelRequest, stream: bool) -> ChatPayload {
        ChatPayload {
            model: self.model.clone(),
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools: request.tools.clone(),
            stream,
            options: ChatOptions {
                temperature: self.temperature,
                num_ctx: self.context_length,
            },
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaClient {
    async fn chat(&self, request: ModelRequest) -> Result<ModelOutcome, ModelError> {
        let url = self.url("/api/chat");
        info!(
            model = self.model.as_str(),
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending chat request to Ollama"
        );

        let response = self
            .http
            .post(&url)
            .json(&self.payload(&request, false))
            .send()
            .await
            .map_err(ModelError::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_body(&body)
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(ModelError::server(message));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::invalid_response(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(ModelError::server(error));
        }
        let message = body
            .message
            .ok_or_else(|| ModelError::invalid_response("missing message"))?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| OutboundToolCall {
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect::<Vec<_>>();
        debug!(
            tool_calls = tool_calls.len(),
            done_reason = body.done_reason.as_deref(),
            "Received chat response from Ollama"
        );

        Ok(ModelOutcome {
            content: message.content,
            tool_calls,
            done_reason: body.done_reason,
        })
    }

    async fn chat_stream(
        &self,
        request: ModelRequest,
        on_token: TokenSink<'_>,
    ) -> Result<String, ModelError> {
        let url = self.url("/api/chat");
        info!(
            model = self.model.as_str(),
            messages = request.messages.len(),
            "Sending streaming chat request to Ollama"
        );

        let response = self
            .http
            .post(&url)
            .json(&self.payload(&request, true))
            .send()
            .await
            .map_err(ModelError::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = parse_error_body(&body)
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(ModelError::server(message));
        }

        // The body is NDJSON: one chunk object per line, with a trailing
        // partial line carried over between network reads.
        let mut aggregated = String::new();
        let mut buffer = String::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(ModelError::transport)?;
            buffer.push_str(&String::from_utf8_lossy(&bytes));
            while let Some(newline) = buffer.find('\n') {
                let line = buffer[..newline].trim().to_string();
                buffer.drain(..=newline);
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ChatResponse>(&line) {
                    Ok(chunk) => {
                        if let Some(error) = chunk.error {
                            return Err(ModelError::server(error));
                        }
                        if let Some(message) = chunk.message {
                            if !message.content.is_empty() {
                                on_token(&message.content);
                                aggregated.push_str(&message.content);
                            }
                        }
                    }
                    Err(source) => {
                        warn!(%source, "Discarding unparseable stream chunk");
                    }
                }
            }
        }

        Ok(aggregated)
    }

    async fn health(&self) -> ModelHealth {
        let url = self.url("/api/tags");
        match self.http.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let models = response
                    .json::<TagsResponse>()
                    .await
                    .map(|tags| tags.models.into_iter().map(|m| m.name).collect())
                    .unwrap_or_default();
                ModelHealth {
                    available: true,
                    models,
                }
            }
            Ok(response) => {
                warn!(status = %response.status(), "Ollama health probe failed");
                ModelHealth {
                    available: false,
                    models: Vec::new(),
                }
            }
            Err(source) => {
                warn!(%source, "Ollama unreachable during health probe");
                ModelHealth {
                    available: false,
                    models: Vec::new(),
                }
            }
        }
    }
}

fn parse_error_body(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get("error")
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

#[derive(Serialize)]
struct ChatPayload {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f64,
    num_ctx: u32,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<&AgentMessage> for WireMessage {
    fn from(message: &AgentMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    done_reason: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::MessageRole;

    #[test]
    fn wire_message_uses_lowercase_roles() {
        let message = AgentMessage::new(MessageRole::Tool, "output");
        let wire = WireMessage::from(&message);
        assert_eq!(wire.role, "tool");
    }

    #[test]
    fn tool_calls_deserialize_from_ollama_shape() {
        let raw = r#"{
            "message": {
                "content": "",
                "tool_calls": [
                    {"function": {"name": "db_query", "arguments": {"sql": "SELECT 1"}}}
                ]
            },
            "done_reason": "stop"
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let message = parsed.message.unwrap();
        let calls = message.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "db_query");
        assert_eq!(parsed.done_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn error_body_is_extracted() {
        assert_eq!(
            parse_error_body(r#"{"error":"model not found"}"#).as_deref(),
            Some("model not found")
        );
        assert_eq!(parse_error_body("not json"), None);
    }
}
