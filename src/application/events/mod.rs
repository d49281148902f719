//! Per-session event fan-out.
//!
//! Topic = session id. Delivery is best-effort and in-process: publishing
//! never blocks, subscribers that lag lose the oldest events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::broadcast;
use tracing::debug;

pub mod names {
    pub const AGENT_START: &str = "agent:start";
    pub const AGENT_PLANNING: &str = "agent:planning";
    pub const AGENT_PLAN_READY: &str = "agent:plan_ready";
    pub const AGENT_EXECUTING: &str = "agent:executing";
    pub const AGENT_REVIEWING: &str = "agent:reviewing";
    pub const AGENT_REVIEW_DONE: &str = "agent:review_done";
    pub const TOOL_EXECUTED: &str = "tool:executed";
    pub const AGENT_DONE: &str = "agent:done";
    pub const AGENT_ERROR: &str = "agent:error";
}

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub event: String,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

pub struct EventBus {
    topics: Mutex<HashMap<String, broadcast::Sender<SessionEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Publishes an event to the session's topic. A send with no live
    /// subscribers is a no-op, not an error.
    pub fn publish(&self, session_id: &str, event: &str, data: Value) {
        let sender = {
            let topics = self.topics.lock().expect("event bus lock");
            topics.get(session_id).cloned()
        };
        if let Some(sender) = sender {
            let delivered = sender
                .send(SessionEvent {
                    event: event.to_string(),
                    data,
                    timestamp: Utc::now(),
                })
                .unwrap_or(0);
            debug!(session_id, event, delivered, "Published session event");
        }
    }

    /// Subscribes to a session's topic, creating it on first use.
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<SessionEvent> {
        let mut topics = self.topics.lock().expect("event bus lock");
        topics
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Drops a session's topic, disconnecting its subscribers.
    pub fn remove(&self, session_id: &str) {
        let mut topics = self.topics.lock().expect("event bus lock");
        topics.remove(session_id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
