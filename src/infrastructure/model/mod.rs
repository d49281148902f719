mod ollama;
mod traits;
mod types;

pub use ollama::OllamaClient;
pub use traits::{ModelProvider, TokenSink};
pub use types::{ModelError, ModelHealth, ModelOutcome, ModelRequest};
