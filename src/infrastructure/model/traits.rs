use super::types::{ModelError, ModelHealth, ModelOutcome, ModelRequest};
use async_trait::async_trait;

/// Callback invoked with each content fragment on the streaming path.
pub type TokenSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Abstraction over the LLM backend. The reasoning loop and the sub-agents
/// only ever speak through this trait, so tests substitute scripted fakes.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// One synchronous round-trip; tool calls may appear on the result.
    async fn chat(&self, request: ModelRequest) -> Result<ModelOutcome, ModelError>;

    /// Streaming variant: emits content fragments as they arrive and
    /// returns the aggregated content. Tool calls never travel this path.
    async fn chat_stream(
        &self,
        request: ModelRequest,
        on_token: TokenSink<'_>,
    ) -> Result<String, ModelError>;

    /// Probes backend liveness and reports the installed models.
    async fn health(&self) -> ModelHealth;
}
