//! Manager-level federation behavior with real scripted child processes.

mod common;

use agentd::application::agent::AgentRunRequest;
use agentd::application::federation::{ExternalServerManager, NewServerConfig};
use agentd::domain::types::Role;
use common::*;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const FILE_SERVER: &str = r#"#!/bin/sh
while IFS= read -r line; do
  case "$line" in
    *'"method":"initialize"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":1,"result":{"protocolVersion":"2024-11-05","capabilities":{},"serverInfo":{"name":"files"}}}' ;;
    *'"method":"tools/list"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":2,"result":{"tools":[{"name":"read_file","description":"Read a file","inputSchema":{"type":"object","properties":{"path":{"type":"string"}}}}]}}' ;;
    *'"method":"tools/call"'*)
      printf '%s\n' '{"jsonrpc":"2.0","id":3,"result":{"content":[{"type":"text","text":"hello from the child"}]}}' ;;
  esac
done
"#;

fn server_config(script: &Path) -> NewServerConfig {
    NewServerConfig {
        name: "files".to_string(),
        description: Some("scripted file server".to_string()),
        command: script.display().to_string(),
        args: Vec::new(),
        env: HashMap::new(),
        enabled: true,
    }
}

#[tokio::test]
async fn added_server_exposes_prefixed_tools_and_routes_calls() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "files.sh", FILE_SERVER);
    let manager = ExternalServerManager::load(dir.path().join("servers.json"))
        .await
        .unwrap();

    let added = manager.add(server_config(&script)).await.unwrap();

    let tools = manager.all_tools().await;
    assert_eq!(tools.len(), 1);
    let full_name = tools[0].full_name();
    assert_eq!(full_name, format!("mcp__{}__read_file", added.id));

    let result = manager
        .execute(&full_name, json!({"path": "x"}))
        .await
        .unwrap();
    assert_eq!(result, json!("hello from the child"));

    let statuses = manager.status().await;
    assert_eq!(statuses.len(), 1);
    assert!(statuses[0].connected);
    assert_eq!(statuses[0].tool_count, 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn disabled_servers_are_not_connected() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "files.sh", FILE_SERVER);
    let manager = ExternalServerManager::load(dir.path().join("servers.json"))
        .await
        .unwrap();

    let mut config = server_config(&script);
    config.enabled = false;
    manager.add(config).await.unwrap();

    assert!(manager.all_tools().await.is_empty());
    let statuses = manager.status().await;
    assert!(!statuses[0].connected);
}

#[tokio::test]
async fn connect_all_isolates_failures_per_server() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "files.sh", FILE_SERVER);
    let manager = ExternalServerManager::load(dir.path().join("servers.json"))
        .await
        .unwrap();

    let good = manager.add(server_config(&script)).await.unwrap();
    let bad = manager
        .add(NewServerConfig {
            name: "ghost".to_string(),
            description: None,
            command: "/definitely/not/a/binary".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            enabled: true,
        })
        .await
        .unwrap();

    // The failed server is reported in its status while the healthy one
    // keeps serving tools.
    let statuses = manager.status().await;
    let good_status = statuses.iter().find(|s| s.config.id == good.id).unwrap();
    let bad_status = statuses.iter().find(|s| s.config.id == bad.id).unwrap();
    assert!(good_status.connected);
    assert!(!bad_status.connected);
    assert!(bad_status.error.is_some());
    assert_eq!(manager.all_tools().await.len(), 1);

    manager.shutdown().await;
}

#[tokio::test]
async fn reconnect_replaces_the_running_child() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "files.sh", FILE_SERVER);
    let manager = ExternalServerManager::load(dir.path().join("servers.json"))
        .await
        .unwrap();

    let added = manager.add(server_config(&script)).await.unwrap();
    manager.reconnect(added.id).await.unwrap();

    let tools = manager.all_tools().await;
    assert_eq!(tools.len(), 1);
    let result = manager
        .execute(&tools[0].full_name(), json!({}))
        .await
        .unwrap();
    assert_eq!(result, json!("hello from the child"));

    manager.shutdown().await;
}

#[tokio::test]
async fn reasoning_loop_round_trips_a_federated_tool() {
    use agentd::application::catalog::ToolCatalog;
    use agentd::config::AppConfig;
    use agentd::infrastructure::server::AppState;
    use std::sync::Arc;

    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "files.sh", FILE_SERVER);
    let mut config = AppConfig::from_lookup(|_| None);
    config.servers_file = dir.path().join("servers.json");

    // Connect the server first so the tool's full name is known when the
    // provider is scripted.
    let federation = Arc::new(
        ExternalServerManager::load(config.servers_file.clone())
            .await
            .unwrap(),
    );
    let added = federation.add(server_config(&script)).await.unwrap();
    let full_name = format!("mcp__{}__read_file", added.id);

    let provider = ScriptedProvider::new(vec![
        tool_turn(vec![(full_name.as_str(), json!({"path": "notes.txt"}))]),
        text_turn("The file says: hello from the child"),
    ]);
    let state = AppState::assemble(
        config,
        provider.clone(),
        Arc::new(ToolCatalog::with_tools(Vec::new())),
        federation,
    );

    let session = state.sessions.create("alice", Role::Readonly);
    let timeline = state
        .agent
        .run(AgentRunRequest::new("read my notes", &session.session_id, Role::Readonly))
        .await;

    assert_eq!(timeline.tool_calls.len(), 1);
    assert_eq!(timeline.tool_calls[0].tool_name, full_name);
    assert!(timeline.tool_calls[0].succeeded());
    assert_eq!(timeline.final_response, "The file says: hello from the child");

    // The federated tool was offered to the model with its full name,
    // and the child's text content came back as a tool message.
    let requests = provider.requests();
    assert!(requests[0]
        .tools
        .iter()
        .any(|tool| tool["function"]["name"] == full_name.as_str()));
    assert!(requests[1]
        .messages
        .iter()
        .any(|m| m.content.contains("hello from the child")));

    state.federation.shutdown().await;
}
