//! Backing connectors for the built-in tools.
//!
//! Every tool dispatches through the [`ToolInvoker`] trait; the SQL and
//! key-value subdomains sit behind backend traits so deployments can swap
//! in real clients while tests and local runs use the in-memory backends.

mod db;
mod fs;
mod git;
mod kv;
mod rest;
mod web;

pub use db::{DbOp, DbTool, MemorySqlBackend, SqlBackend};
pub use fs::{FsOp, FsTool};
pub use git::{GitOp, GitTool};
pub use kv::{KvBackend, KvOp, KvTool, MemoryKvBackend};
pub use rest::{RestOp, RestTool};
pub use web::{WebOp, WebTool};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("{0}")]
    Message(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl InvokeError {
    pub fn message(text: impl Into<String>) -> Self {
        Self::Message(text.into())
    }
}

/// Uniform invocation interface: built-in tools register concrete
/// invokers, federated tools forward to the server manager.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError>;
}

pub(crate) fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, InvokeError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| InvokeError::message(format!("missing required argument '{key}'")))
}

pub(crate) fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}
