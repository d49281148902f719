use super::{required_str, InvokeError, ToolInvoker};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Seam for the key-value/queue connector (a Redis client in production).
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, InvokeError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), InvokeError>;
    async fn push(&self, queue: &str, value: Value) -> Result<usize, InvokeError>;
    async fn pop(&self, queue: &str) -> Result<Option<Value>, InvokeError>;
}

#[derive(Debug, Clone, Copy)]
pub enum KvOp {
    Get,
    Set,
    QueuePush,
    QueuePop,
}

pub struct KvTool {
    op: KvOp,
    backend: Arc<dyn KvBackend>,
}

impl KvTool {
    pub fn new(op: KvOp, backend: Arc<dyn KvBackend>) -> Self {
        Self { op, backend }
    }
}

#[async_trait]
impl ToolInvoker for KvTool {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError> {
        match self.op {
            KvOp::Get => {
                let key = required_str(&args, "key")?;
                let value = self.backend.get(key).await?;
                Ok(json!({ "key": key, "value": value, "found": value_found(&value) }))
            }
            KvOp::Set => {
                let key = required_str(&args, "key")?;
                let value = args
                    .get("value")
                    .cloned()
                    .ok_or_else(|| InvokeError::message("missing required argument 'value'"))?;
                self.backend.set(key, value).await?;
                Ok(json!({ "key": key, "stored": true }))
            }
            KvOp::QueuePush => {
                let queue = required_str(&args, "queue")?;
                let value = args
                    .get("value")
                    .cloned()
                    .ok_or_else(|| InvokeError::message("missing required argument 'value'"))?;
                let depth = self.backend.push(queue, value).await?;
                Ok(json!({ "queue": queue, "depth": depth }))
            }
            KvOp::QueuePop => {
                let queue = required_str(&args, "queue")?;
                let value = self.backend.pop(queue).await?;
                Ok(json!({ "queue": queue, "value": value, "found": value_found(&value) }))
            }
        }
    }
}

fn value_found(value: &Option<Value>) -> bool {
    value.is_some()
}

/// In-memory development backend for keys and FIFO queues.
pub struct MemoryKvBackend {
    keys: Mutex<HashMap<String, Value>>,
    queues: Mutex<HashMap<String, VecDeque<Value>>>,
}

impl MemoryKvBackend {
    pub fn new() -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryKvBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for MemoryKvBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, InvokeError> {
        Ok(self.keys.lock().expect("kv lock").get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), InvokeError> {
        self.keys
            .lock()
            .expect("kv lock")
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn push(&self, queue: &str, value: Value) -> Result<usize, InvokeError> {
        let mut queues = self.queues.lock().expect("queue lock");
        let entry = queues.entry(queue.to_string()).or_default();
        entry.push_back(value);
        Ok(entry.len())
    }

    async fn pop(&self, queue: &str) -> Result<Option<Value>, InvokeError> {
        let mut queues = self.queues.lock().expect("queue lock");
        Ok(queues.get_mut(queue).and_then(VecDeque::pop_front))
    }
}
