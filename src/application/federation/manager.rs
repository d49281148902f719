use super::client::{ExternalServerClient, FederatedTool};
use super::error::FederationError;
use crate::domain::types::{ExternalServerConfig, ExternalServerStatus};
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Incoming server definition; the manager assigns the id.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewServerConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ServerConfigPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<HashMap<String, String>>,
    pub enabled: Option<bool>,
}

#[derive(Default)]
struct ManagerState {
    configs: Vec<ExternalServerConfig>,
    clients: HashMap<Uuid, Arc<ExternalServerClient>>,
    connect_errors: HashMap<Uuid, String>,
}

/// Owns every external tool-server connection, keyed by server id, and
/// the JSON file the configuration persists to. Every mutating operation
/// writes through to disk under the manager lock.
pub struct ExternalServerManager {
    servers_file: PathBuf,
    state: Mutex<ManagerState>,
}

impl ExternalServerManager {
    /// Loads persisted configuration; a missing file is an empty list.
    pub async fn load(servers_file: PathBuf) -> Result<Self, FederationError> {
        let configs = match tokio::fs::read(&servers_file).await {
            Ok(bytes) => serde_json::from_slice::<Vec<ExternalServerConfig>>(&bytes)
                .map_err(|source| FederationError::Persist {
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
                })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(FederationError::Persist { source }),
        };
        info!(
            path = %servers_file.display(),
            servers = configs.len(),
            "Loaded external server configuration"
        );
        Ok(Self {
            servers_file,
            state: Mutex::new(ManagerState {
                configs,
                ..Default::default()
            }),
        })
    }

    /// Connects every enabled server in parallel. Failures are captured
    /// per server id and never abort startup.
    pub async fn connect_all(&self) -> HashMap<Uuid, String> {
        let targets: Vec<(Uuid, Arc<ExternalServerClient>)> = {
            let mut state = self.state.lock().await;
            let enabled: Vec<ExternalServerConfig> = state
                .configs
                .iter()
                .filter(|config| config.enabled)
                .cloned()
                .collect();
            enabled
                .into_iter()
                .map(|config| {
                    let id = config.id;
                    let client = Arc::new(ExternalServerClient::new(config));
                    state.clients.insert(id, client.clone());
                    (id, client)
                })
                .collect()
        };

        let results = join_all(targets.iter().map(|(id, client)| {
            let id = *id;
            let client = client.clone();
            async move { (id, client.connect().await) }
        }))
        .await;

        let mut errors = HashMap::new();
        {
            let mut state = self.state.lock().await;
            for (id, result) in results {
                if let Err(err) = result {
                    warn!(server_id = %id, %err, "External server failed to connect");
                    state.connect_errors.insert(id, err.to_string());
                    errors.insert(id, err.to_string());
                } else {
                    state.connect_errors.remove(&id);
                }
            }
        }
        errors
    }

    pub async fn add(&self, new: NewServerConfig) -> Result<ExternalServerConfig, FederationError> {
        let config = ExternalServerConfig {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            command: new.command,
            args: new.args,
            env: new.env,
            enabled: new.enabled,
        };
        {
            let mut state = self.state.lock().await;
            state.configs.push(config.clone());
            self.persist(&state).await?;
        }
        if config.enabled {
            self.spawn_client(config.clone()).await;
        }
        Ok(config)
    }

    pub async fn remove(&self, id: Uuid) -> Result<bool, FederationError> {
        let client = {
            let mut state = self.state.lock().await;
            let before = state.configs.len();
            state.configs.retain(|config| config.id != id);
            if state.configs.len() == before {
                return Ok(false);
            }
            state.connect_errors.remove(&id);
            let client = state.clients.remove(&id);
            self.persist(&state).await?;
            client
        };
        if let Some(client) = client {
            client.disconnect().await;
        }
        Ok(true)
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: ServerConfigPatch,
    ) -> Result<ExternalServerConfig, FederationError> {
        let (updated, previous_client) = {
            let mut state = self.state.lock().await;
            let config = state
                .configs
                .iter_mut()
                .find(|config| config.id == id)
                .ok_or_else(|| FederationError::UnknownServer { id: id.to_string() })?;

            if let Some(name) = patch.name {
                config.name = name;
            }
            if let Some(description) = patch.description {
                config.description = Some(description);
            }
            if let Some(command) = patch.command {
                config.command = command;
            }
            if let Some(args) = patch.args {
                config.args = args;
            }
            if let Some(env) = patch.env {
                config.env = env;
            }
            if let Some(enabled) = patch.enabled {
                config.enabled = enabled;
            }
            let updated = config.clone();
            let previous = state.clients.remove(&id);
            self.persist(&state).await?;
            (updated, previous)
        };

        // Reap the old connection before (re)connecting with the merged
        // config.
        if let Some(client) = previous_client {
            client.disconnect().await;
        }
        if updated.enabled {
            self.spawn_client(updated.clone()).await;
        }
        Ok(updated)
    }

    pub async fn reconnect(&self, id: Uuid) -> Result<(), FederationError> {
        let config = {
            let mut state = self.state.lock().await;
            let config = state
                .configs
                .iter()
                .find(|config| config.id == id)
                .cloned()
                .ok_or_else(|| FederationError::UnknownServer { id: id.to_string() })?;
            if let Some(previous) = state.clients.remove(&id) {
                tokio::spawn(async move { previous.disconnect().await });
            }
            config
        };
        self.spawn_client(config).await;
        Ok(())
    }

    /// Union of tools across all connected servers.
    pub async fn all_tools(&self) -> Vec<FederatedTool> {
        let clients: Vec<Arc<ExternalServerClient>> = {
            let state = self.state.lock().await;
            state.clients.values().cloned().collect()
        };
        let mut tools = Vec::new();
        for client in clients {
            if client.is_connected() {
                tools.extend(client.tools().await);
            }
        }
        tools
    }

    /// Executes `mcp__<server_id>__<tool_name>` by routing to the owning
    /// client. The split is on the first `__` after the prefix, so tool
    /// names may themselves contain `__`.
    pub async fn execute(&self, full_name: &str, args: Value) -> Result<Value, FederationError> {
        let (server_id, tool_name) =
            parse_full_name(full_name).ok_or_else(|| FederationError::InvalidName {
                name: full_name.to_string(),
            })?;
        let client = {
            let state = self.state.lock().await;
            state.clients.get(&server_id).cloned()
        }
        .ok_or_else(|| FederationError::UnknownServer {
            id: server_id.to_string(),
        })?;
        if !client.is_connected() {
            return Err(FederationError::Disconnected);
        }
        client.call_tool(tool_name, args).await
    }

    /// Snapshot of every configured server. Never blocks on the child
    /// processes.
    pub async fn status(&self) -> Vec<ExternalServerStatus> {
        let state = self.state.lock().await;
        let mut statuses = Vec::with_capacity(state.configs.len());
        for config in &state.configs {
            let client = state.clients.get(&config.id);
            let connected = client.map(|c| c.is_connected()).unwrap_or(false);
            let tool_count = match client {
                Some(client) if connected => client.tools().await.len(),
                _ => 0,
            };
            statuses.push(ExternalServerStatus {
                config: config.clone(),
                connected,
                tool_count,
                error: state.connect_errors.get(&config.id).cloned(),
            });
        }
        statuses
    }

    /// Disconnects every client; used on graceful shutdown.
    pub async fn shutdown(&self) {
        let clients: Vec<Arc<ExternalServerClient>> = {
            let mut state = self.state.lock().await;
            state.clients.drain().map(|(_, client)| client).collect()
        };
        for client in clients {
            client.disconnect().await;
        }
    }

    async fn spawn_client(&self, config: ExternalServerConfig) {
        let id = config.id;
        let client = Arc::new(ExternalServerClient::new(config));
        {
            let mut state = self.state.lock().await;
            state.clients.insert(id, client.clone());
        }
        match client.connect().await {
            Ok(()) => {
                let mut state = self.state.lock().await;
                state.connect_errors.remove(&id);
            }
            Err(err) => {
                warn!(server_id = %id, %err, "External server failed to connect");
                let mut state = self.state.lock().await;
                state.connect_errors.insert(id, err.to_string());
            }
        }
    }

    /// Atomic write-through: serialize to a sibling temp file, then
    /// rename over the target.
    async fn persist(&self, state: &ManagerState) -> Result<(), FederationError> {
        let body = serde_json::to_vec_pretty(&state.configs).map_err(|source| {
            FederationError::Persist {
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, source),
            }
        })?;
        let temp = self.servers_file.with_extension("json.tmp");
        tokio::fs::write(&temp, &body)
            .await
            .map_err(|source| FederationError::Persist { source })?;
        tokio::fs::rename(&temp, &self.servers_file)
            .await
            .map_err(|source| FederationError::Persist { source })?;
        Ok(())
    }
}

fn parse_full_name(full_name: &str) -> Option<(Uuid, &str)> {
    let rest = full_name.strip_prefix("mcp__")?;
    let (server_part, tool_part) = rest.split_once("__")?;
    let server_id = Uuid::parse_str(server_part).ok()?;
    (!tool_part.is_empty()).then_some((server_id, tool_part))
}
