//! In-memory execution counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use utoipa::ToSchema;

/// Most recent sessions retained in the snapshot.
const RECENT_SESSION_CAP: usize = 50;

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ToolMetrics {
    pub count: u64,
    pub successes: u64,
    pub errors: u64,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionActivity {
    pub session_id: String,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemMetrics {
    pub total_requests: u64,
    pub total_tool_calls: u64,
    pub total_duration_ms: u64,
    pub tools: HashMap<String, ToolMetrics>,
    pub recent_sessions: Vec<SessionActivity>,
}

#[derive(Default)]
struct MetricsInner {
    total_requests: u64,
    total_tool_calls: u64,
    total_duration_ms: u64,
    tools: HashMap<String, ToolMetrics>,
    recent_sessions: Vec<SessionActivity>,
}

pub struct MetricsStore {
    inner: Mutex<MetricsInner>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsInner::default()),
        }
    }

    pub fn record_request(&self, session_id: &str) {
        let mut inner = self.inner.lock().expect("metrics lock");
        inner.total_requests += 1;
        // Move the session to the front, LRU-style, bounded by the cap.
        inner
            .recent_sessions
            .retain(|entry| entry.session_id != session_id);
        inner.recent_sessions.insert(
            0,
            SessionActivity {
                session_id: session_id.to_string(),
                last_seen: Utc::now(),
            },
        );
        inner.recent_sessions.truncate(RECENT_SESSION_CAP);
    }

    pub fn record_tool_call(&self, tool_name: &str, success: bool, duration_ms: u64) {
        let mut inner = self.inner.lock().expect("metrics lock");
        inner.total_tool_calls += 1;
        inner.total_duration_ms += duration_ms;
        let entry = inner.tools.entry(tool_name.to_string()).or_default();
        entry.count += 1;
        entry.total_duration_ms += duration_ms;
        if success {
            entry.successes += 1;
        } else {
            entry.errors += 1;
        }
    }

    pub fn snapshot(&self) -> SystemMetrics {
        let inner = self.inner.lock().expect("metrics lock");
        SystemMetrics {
            total_requests: inner.total_requests,
            total_tool_calls: inner.total_tool_calls,
            total_duration_ms: inner.total_duration_ms,
            tools: inner.tools.clone(),
            recent_sessions: inner.recent_sessions.clone(),
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("metrics lock");
        *inner = MetricsInner::default();
    }
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}
