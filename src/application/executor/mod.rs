//! Tool execution: permission gating, guards, and routing.
//!
//! Built-in names dispatch to their registered invoker; any name starting
//! with `mcp__` routes to the federation manager. Tool failures never
//! propagate as errors — they are recorded on the returned [`ToolCall`]
//! and the conversation continues.

use crate::application::catalog::ToolCatalog;
use crate::application::events::{names, EventBus};
use crate::application::federation::ExternalServerManager;
use crate::application::metrics::MetricsStore;
use crate::domain::types::{Role, ToolCall, ToolCallStatus};
use chrono::Utc;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const FEDERATED_PREFIX: &str = "mcp__";

pub struct ToolExecutor {
    catalog: Arc<ToolCatalog>,
    federation: Arc<ExternalServerManager>,
    metrics: Arc<MetricsStore>,
    events: Arc<EventBus>,
}

impl ToolExecutor {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        federation: Arc<ExternalServerManager>,
        metrics: Arc<MetricsStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            catalog,
            federation,
            metrics,
            events,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Executes one tool call and returns its record. The record is final
    /// once returned: `finished_at` and `duration_ms` are always set.
    pub async fn execute(
        &self,
        session_id: &str,
        tool_name: &str,
        args: Value,
        caller_role: Role,
    ) -> ToolCall {
        let mut call = ToolCall::begin(tool_name, args);

        if tool_name.starts_with(FEDERATED_PREFIX) {
            call.status = ToolCallStatus::Running;
            match self.federation.execute(tool_name, call.args.clone()).await {
                Ok(result) => self.finish_success(&mut call, result),
                Err(err) => self.finish_error(&mut call, err.to_string()),
            }
        } else {
            self.execute_builtin(&mut call, caller_role).await;
        }

        self.metrics
            .record_tool_call(tool_name, call.succeeded(), call.duration_ms.unwrap_or(0));
        self.events.publish(
            session_id,
            names::TOOL_EXECUTED,
            json!({ "tool_call": &call }),
        );
        call
    }

    async fn execute_builtin(&self, call: &mut ToolCall, caller_role: Role) {
        let Some(spec) = self.catalog.by_name(&call.tool_name).cloned() else {
            warn!(tool = call.tool_name.as_str(), "Unknown tool requested");
            self.finish_error(call, format!("Unknown tool: {}", call.tool_name));
            return;
        };

        if !spec.required_roles.contains(&caller_role) {
            info!(
                tool = call.tool_name.as_str(),
                role = caller_role.as_str(),
                "Tool call blocked by role"
            );
            call.status = ToolCallStatus::Error;
            call.error = Some(format!(
                "Permission denied: role '{}' cannot use tool '{}'",
                caller_role.as_str(),
                call.tool_name
            ));
            call.finished_at = Some(Utc::now());
            call.duration_ms = Some(0);
            return;
        }

        if let Some(sql) = call.args.get("sql").and_then(Value::as_str) {
            if let Some(placeholder) = unresolved_placeholder(sql) {
                self.finish_error(
                    call,
                    format!(
                        "SQL contains unresolved template placeholder '{{{placeholder}}}'; \
                         pass real values via params instead"
                    ),
                );
                return;
            }
        }

        if call.args.get("repo_path").is_some() {
            apply_repo_path_fallback(&mut call.args);
        }

        // The invoker exists for every spec the catalog handed out.
        let Some(invoker) = self.catalog.invoker(&call.tool_name) else {
            self.finish_error(call, format!("Unknown tool: {}", call.tool_name));
            return;
        };
        call.status = ToolCallStatus::Running;
        debug!(tool = call.tool_name.as_str(), "Dispatching built-in tool");
        match invoker.invoke(call.args.clone()).await {
            Ok(result) => self.finish_success(call, result),
            Err(err) => self.finish_error(call, err.to_string()),
        }
    }

    fn finish_success(&self, call: &mut ToolCall, result: Value) {
        call.status = ToolCallStatus::Success;
        call.result = Some(result);
        self.stamp(call);
        info!(
            tool = call.tool_name.as_str(),
            duration_ms = call.duration_ms.unwrap_or(0),
            "Tool executed"
        );
    }

    fn finish_error(&self, call: &mut ToolCall, message: String) {
        warn!(
            tool = call.tool_name.as_str(),
            error = message.as_str(),
            "Tool execution failed"
        );
        call.status = ToolCallStatus::Error;
        call.error = Some(message);
        self.stamp(call);
    }

    fn stamp(&self, call: &mut ToolCall) {
        let now = Utc::now();
        call.duration_ms = Some((now - call.started_at).num_milliseconds().max(0) as u64);
        call.finished_at = Some(now);
    }
}

/// Finds a `{identifier}` template literal the model left unresolved in
/// a SQL body. Real parameters travel through `params`, never inline.
fn unresolved_placeholder(sql: &str) -> Option<String> {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len()
                && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
            {
                end += 1;
            }
            if end > start
                && end < bytes.len()
                && bytes[end] == b'}'
                && (bytes[start].is_ascii_alphabetic() || bytes[start] == b'_')
            {
                return Some(sql[start..end].to_string());
            }
        }
        i += 1;
    }
    None
}

/// Substitutes the process working directory when the supplied repository
/// path is missing, not a directory, or not actually a repository.
fn apply_repo_path_fallback(args: &mut Value) {
    let usable = args
        .get("repo_path")
        .and_then(Value::as_str)
        .map(|raw| {
            let path = Path::new(raw);
            path.is_dir() && path.join(".git").exists()
        })
        .unwrap_or(false);
    if !usable {
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| ".".to_string());
        debug!(fallback = cwd.as_str(), "repo_path unusable, using cwd");
        if let Some(map) = args.as_object_mut() {
            map.insert("repo_path".to_string(), Value::String(cwd));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_detection_matches_template_literals() {
        assert_eq!(
            unresolved_placeholder("INSERT INTO gold(price) VALUES ({price})").as_deref(),
            Some("price")
        );
        assert_eq!(
            unresolved_placeholder("SELECT * FROM t WHERE v = {x1}").as_deref(),
            Some("x1")
        );
        assert!(unresolved_placeholder("SELECT * FROM t WHERE v = ?").is_none());
        // JSON braces do not qualify: the body must look like an identifier.
        assert!(unresolved_placeholder("SELECT '{}' ").is_none());
        assert!(unresolved_placeholder("SELECT '{1abc}'").is_none());
    }

    #[test]
    fn repo_path_fallback_replaces_bad_paths() {
        let mut args = serde_json::json!({ "repo_path": "/definitely/not/here" });
        apply_repo_path_fallback(&mut args);
        let cwd = std::env::current_dir().unwrap().display().to_string();
        assert_eq!(args["repo_path"], cwd);
    }
}
