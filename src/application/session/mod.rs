//! In-process session memory.
//!
//! Sessions live until cleared or the process exits. Message history is
//! strictly append-only and the role is fixed at creation; `updated_at`
//! moves forward monotonically with every mutation.

use crate::domain::types::{AgentMessage, Role};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionMemory {
    pub session_id: String,
    pub user_id: String,
    pub role: Role,
    pub messages: Vec<AgentMessage>,
    #[schema(value_type = Object)]
    pub variables: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub role: Role,
    pub message_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HistorySummary {
    pub message_count: usize,
    pub tool_call_count: usize,
    pub last_activity: DateTime<Utc>,
}

struct SessionSlot {
    memory: Mutex<SessionMemory>,
    /// Serializes whole reasoning runs on the same session so concurrent
    /// chat requests cannot interleave their history appends.
    run_lock: Arc<tokio::sync::Mutex<()>>,
}

pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<SessionSlot>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, user_id: &str, role: Role) -> SessionMemory {
        let now = Utc::now();
        let memory = SessionMemory {
            session_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            role,
            messages: Vec::new(),
            variables: HashMap::new(),
            created_at: now,
            updated_at: now,
        };
        let slot = Arc::new(SessionSlot {
            memory: Mutex::new(memory.clone()),
            run_lock: Arc::new(tokio::sync::Mutex::new(())),
        });
        self.sessions
            .lock()
            .expect("session store lock")
            .insert(memory.session_id.clone(), slot);
        memory
    }

    pub fn get(&self, session_id: &str) -> Option<SessionMemory> {
        let slot = self.slot(session_id)?;
        let memory = slot.memory.lock().expect("session lock");
        Some(memory.clone())
    }

    /// Returns the existing session, or creates one when `session_id` is
    /// absent or unknown.
    pub fn get_or_create(
        &self,
        session_id: Option<&str>,
        user_id: &str,
        role: Role,
    ) -> SessionMemory {
        if let Some(id) = session_id {
            if let Some(existing) = self.get(id) {
                return existing;
            }
        }
        self.create(user_id, role)
    }

    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .expect("session store lock")
            .remove(session_id)
            .is_some()
    }

    pub fn set_variable(&self, session_id: &str, key: impl Into<String>, value: Value) -> bool {
        let Some(slot) = self.slot(session_id) else {
            return false;
        };
        let mut memory = slot.memory.lock().expect("session lock");
        memory.variables.insert(key.into(), value);
        memory.updated_at = Utc::now();
        true
    }

    /// Appends one message to the session history. Append is the only
    /// mutation the history supports.
    pub fn append_message(&self, session_id: &str, message: AgentMessage) -> bool {
        let Some(slot) = self.slot(session_id) else {
            return false;
        };
        let mut memory = slot.memory.lock().expect("session lock");
        memory.messages.push(message);
        memory.updated_at = Utc::now();
        true
    }

    /// The last `limit` messages, oldest first, for model context replay.
    pub fn recent_messages(&self, session_id: &str, limit: usize) -> Vec<AgentMessage> {
        let Some(slot) = self.slot(session_id) else {
            return Vec::new();
        };
        let memory = slot.memory.lock().expect("session lock");
        let skip = memory.messages.len().saturating_sub(limit);
        memory.messages[skip..].to_vec()
    }

    pub fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.lock().expect("session store lock");
        let mut summaries: Vec<SessionSummary> = sessions
            .values()
            .map(|slot| {
                let memory = slot.memory.lock().expect("session lock");
                SessionSummary {
                    session_id: memory.session_id.clone(),
                    user_id: memory.user_id.clone(),
                    role: memory.role,
                    message_count: memory.messages.len(),
                    created_at: memory.created_at,
                    updated_at: memory.updated_at,
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries
    }

    pub fn history_summary(&self, session_id: &str) -> Option<HistorySummary> {
        let slot = self.slot(session_id)?;
        let memory = slot.memory.lock().expect("session lock");
        let tool_call_count = memory
            .messages
            .iter()
            .filter_map(|m| m.tool_calls.as_ref())
            .map(|calls| calls.len())
            .sum();
        Some(HistorySummary {
            message_count: memory.messages.len(),
            tool_call_count,
            last_activity: memory.updated_at,
        })
    }

    /// Per-session run mutex; callers hold the guard for the whole
    /// reasoning run.
    pub fn run_lock(&self, session_id: &str) -> Option<Arc<tokio::sync::Mutex<()>>> {
        self.slot(session_id).map(|slot| slot.run_lock.clone())
    }

    fn slot(&self, session_id: &str) -> Option<Arc<SessionSlot>> {
        self.sessions
            .lock()
            .expect("session store lock")
            .get(session_id)
            .cloned()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
