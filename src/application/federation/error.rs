use thiserror::Error;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("failed to spawn tool server '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport error on tool server '{name}': {message}")]
    Transport { name: String, message: String },
    #[error("Request timeout: {method}")]
    Timeout { method: String },
    #[error("Disconnected")]
    Disconnected,
    #[error("tool server returned error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("unknown tool server '{id}'")]
    UnknownServer { id: String },
    #[error("invalid federated tool name '{name}'")]
    InvalidName { name: String },
    #[error("failed to persist server configuration: {source}")]
    Persist {
        #[source]
        source: std::io::Error,
    },
}

impl FederationError {
    pub fn transport(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            name: name.into(),
            message: message.into(),
        }
    }
}
