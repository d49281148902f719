use super::error::FederationError;
use crate::domain::types::ExternalServerConfig;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

const PROTOCOL_VERSION: &str = "2024-11-05";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const WRITE_QUEUE_DEPTH: usize = 64;

/// A tool discovered on a connected server. The `mcp__<server>__<tool>`
/// full name is assembled only when the tool is projected to the model.
#[derive(Debug, Clone)]
pub struct FederatedTool {
    pub server_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Value,
}

impl FederatedTool {
    pub fn full_name(&self) -> String {
        format!("mcp__{}__{}", self.server_id, self.name)
    }
}

type PendingTable = Mutex<HashMap<u64, oneshot::Sender<Result<Value, FederationError>>>>;

/// One child tool-server process speaking line-delimited JSON-RPC 2.0
/// over stdio.
///
/// Writes to the child's stdin flow through a single writer task fed by a
/// channel; inbound lines are handled by a single reader task. The pending
/// table is the only state both sides touch, guarded by its own lock.
pub struct ExternalServerClient {
    config: ExternalServerConfig,
    connected: AtomicBool,
    next_id: AtomicU64,
    pending: Arc<PendingTable>,
    write_tx: Mutex<Option<mpsc::Sender<String>>>,
    child: Mutex<Option<Child>>,
    tools: Mutex<Vec<FederatedTool>>,
    request_timeout: Duration,
}

impl ExternalServerClient {
    pub fn new(config: ExternalServerConfig) -> Self {
        Self {
            config,
            connected: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            write_tx: Mutex::new(None),
            child: Mutex::new(None),
            tools: Mutex::new(Vec::new()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Overrides the per-request deadline; used by tests to avoid waiting
    /// out the full default.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub async fn tools(&self) -> Vec<FederatedTool> {
        self.tools.lock().await.clone()
    }

    /// Spawns the child process and runs the protocol handshake:
    /// `initialize`, the `notifications/initialized` notification, then
    /// `tools/list`.
    pub async fn connect(self: &Arc<Self>) -> Result<(), FederationError> {
        if self.is_connected() {
            return Ok(());
        }
        info!(
            server = self.config.name.as_str(),
            command = self.config.command.as_str(),
            "Starting external tool server"
        );

        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| FederationError::Spawn {
                name: self.config.name.clone(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FederationError::transport(&self.config.name, "no stdin pipe"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FederationError::transport(&self.config.name, "no stdout pipe"))?;
        let stderr = child.stderr.take();

        let (write_tx, mut write_rx) = mpsc::channel::<String>(WRITE_QUEUE_DEPTH);
        let mut writer = BufWriter::new(stdin);
        tokio::spawn(async move {
            while let Some(line) = write_rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(b"\n").await.is_err() {
                    break;
                }
                let _ = writer.flush().await;
            }
        });

        if let Some(stderr) = stderr {
            let server = self.config.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(server = server.as_str(), line = line.as_str(), "tool server stderr");
                }
            });
        }

        {
            let mut tx = self.write_tx.lock().await;
            *tx = Some(write_tx);
        }
        {
            let mut slot = self.child.lock().await;
            *slot = Some(child);
        }
        self.connected.store(true, Ordering::SeqCst);

        let reader_self = Arc::clone(self);
        tokio::spawn(async move {
            reader_self.reader_loop(stdout).await;
        });

        match self.handshake().await {
            Ok(()) => {
                let tool_count = self.tools.lock().await.len();
                info!(
                    server = self.config.name.as_str(),
                    tools = tool_count,
                    "External tool server connected"
                );
                Ok(())
            }
            Err(err) => {
                self.disconnect().await;
                Err(err)
            }
        }
    }

    async fn handshake(&self) -> Result<(), FederationError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        });
        self.request("initialize", params).await?;
        self.notify("notifications/initialized", json!({})).await?;

        let listed = self.request("tools/list", json!({})).await?;
        let mut tools = self.tools.lock().await;
        *tools = parse_tool_list(self.config.id, &listed);
        Ok(())
    }

    /// Calls a tool on the server and flattens the reply content: text
    /// items are concatenated newline-separated, non-text items are
    /// JSON-serialized; a non-array content comes back verbatim.
    pub async fn call_tool(&self, name: &str, args: Value) -> Result<Value, FederationError> {
        let arguments = match args {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        Ok(flatten_content(result))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, FederationError> {
        if !self.is_connected() {
            return Err(FederationError::Disconnected);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        if let Err(err) = self.send_line(payload.to_string()).await {
            let mut pending = self.pending.lock().await;
            pending.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FederationError::Disconnected),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                warn!(
                    server = self.config.name.as_str(),
                    method, "Request to tool server timed out"
                );
                Err(FederationError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), FederationError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        });
        self.send_line(payload.to_string()).await
    }

    async fn send_line(&self, line: String) -> Result<(), FederationError> {
        let tx = {
            let guard = self.write_tx.lock().await;
            guard.clone()
        };
        match tx {
            Some(tx) => tx
                .send(line)
                .await
                .map_err(|_| FederationError::Disconnected),
            None => Err(FederationError::Disconnected),
        }
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(message) => self.dispatch_inbound(message).await,
                Err(source) => {
                    warn!(
                        server = self.config.name.as_str(),
                        line = trimmed,
                        %source,
                        "Discarding non-JSON line from tool server"
                    );
                }
            }
        }
        // EOF: the child exited or closed its stdout.
        debug!(
            server = self.config.name.as_str(),
            "Tool server stdout closed"
        );
        self.disconnect().await;
    }

    /// Correlates one inbound message against the pending table. Messages
    /// without an id are notifications and are ignored.
    async fn dispatch_inbound(&self, message: Value) {
        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            if let Some(method) = message.get("method").and_then(Value::as_str) {
                debug!(
                    server = self.config.name.as_str(),
                    method, "Ignoring notification from tool server"
                );
            }
            return;
        };

        let sender = {
            let mut pending = self.pending.lock().await;
            pending.remove(&id)
        };
        let Some(sender) = sender else {
            debug!(
                server = self.config.name.as_str(),
                id, "Response for unknown or expired request"
            );
            return;
        };

        let outcome = if let Some(error) = message.get("error") {
            Err(FederationError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            })
        } else {
            Ok(message.get("result").cloned().unwrap_or(Value::Null))
        };
        let _ = sender.send(outcome);
    }

    /// Kills the child and fails every pending request with a disconnect
    /// error. Idempotent.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        {
            let mut tx = self.write_tx.lock().await;
            *tx = None;
        }
        {
            let mut slot = self.child.lock().await;
            if let Some(mut child) = slot.take() {
                if let Err(err) = child.kill().await {
                    debug!(
                        server = self.config.name.as_str(),
                        %err,
                        "Tool server already exited"
                    );
                }
                let _ = child.wait().await;
            }
        }
        {
            let mut pending = self.pending.lock().await;
            for (_, sender) in pending.drain() {
                let _ = sender.send(Err(FederationError::Disconnected));
            }
        }
        self.tools.lock().await.clear();
        info!(
            server = self.config.name.as_str(),
            "External tool server disconnected"
        );
    }

    #[cfg(test)]
    pub(crate) async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }
}

fn parse_tool_list(server_id: Uuid, listed: &Value) -> Vec<FederatedTool> {
    listed
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|tool| {
                    let name = tool.get("name").and_then(Value::as_str)?;
                    Some(FederatedTool {
                        server_id,
                        name: name.to_string(),
                        description: tool
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        input_schema: tool
                            .get("inputSchema")
                            .cloned()
                            .unwrap_or_else(|| json!({ "type": "object" })),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn flatten_content(result: Value) -> Value {
    let Some(content) = result.get("content").and_then(Value::as_array) else {
        return result;
    };
    let parts: Vec<String> = content
        .iter()
        .map(|item| {
            if item.get("type").and_then(Value::as_str) == Some("text") {
                item.get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            } else {
                item.to_string()
            }
        })
        .collect();
    Value::String(parts.join("\n"))
}
