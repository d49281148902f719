//! Built-in tool catalog.
//!
//! The catalog is assembled once at startup and read-only afterwards.
//! Each entry pairs a declarative [`ToolSpec`] with the concrete invoker
//! that backs it.

pub mod connectors;

use connectors::{
    DbOp, DbTool, FsOp, FsTool, GitOp, GitTool, KvBackend, KvOp, KvTool, MemoryKvBackend,
    MemorySqlBackend, RestOp, RestTool, SqlBackend, ToolInvoker, WebOp, WebTool,
};

use crate::domain::types::Role;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub input_schema: Value,
    pub required_roles: Vec<Role>,
    pub safe_for_production: bool,
}

struct RegisteredTool {
    spec: ToolSpec,
    invoker: Arc<dyn ToolInvoker>,
}

/// Connector wiring for the built-in tools. Deployments replace the SQL
/// and key-value backends with real clients; tests swap in stubs.
pub struct Connectors {
    pub sql: Arc<dyn SqlBackend>,
    pub kv: Arc<dyn KvBackend>,
    pub http: Client,
    pub fs_root: PathBuf,
}

impl Connectors {
    pub fn in_memory(fs_root: PathBuf) -> Self {
        Self {
            sql: Arc::new(MemorySqlBackend::new()),
            kv: Arc::new(MemoryKvBackend::new()),
            http: Client::new(),
            fs_root,
        }
    }
}

pub struct ToolCatalog {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Builds the standard catalog over the given connectors.
    pub fn standard(connectors: Connectors) -> Self {
        let Connectors {
            sql,
            kv,
            http,
            fs_root,
        } = connectors;

        let everyone = roles_at_least(Role::Readonly);
        let dev_up = roles_at_least(Role::Dev);
        let operator_up = roles_at_least(Role::Operator);

        let mut builder = CatalogBuilder::default();

        builder.register(
            ToolSpec {
                name: "db_query".into(),
                description: "Run a read-only SQL query with positional parameters.".into(),
                input_schema: object_schema(
                    json!({
                        "sql": { "type": "string", "description": "SELECT statement; use ? placeholders" },
                        "params": { "type": "array", "items": {} }
                    }),
                    &["sql"],
                ),
                required_roles: everyone.clone(),
                safe_for_production: true,
            },
            Arc::new(DbTool::new(DbOp::Query, sql.clone())),
        );
        builder.register(
            ToolSpec {
                name: "db_execute".into(),
                description: "Run a mutating SQL statement (INSERT/UPDATE/DELETE).".into(),
                input_schema: object_schema(
                    json!({
                        "sql": { "type": "string" },
                        "params": { "type": "array", "items": {} }
                    }),
                    &["sql"],
                ),
                required_roles: operator_up.clone(),
                safe_for_production: false,
            },
            Arc::new(DbTool::new(DbOp::Execute, sql.clone())),
        );
        builder.register(
            ToolSpec {
                name: "db_migrate".into(),
                description: "Apply a schema migration statement.".into(),
                input_schema: object_schema(json!({ "sql": { "type": "string" } }), &["sql"]),
                required_roles: operator_up.clone(),
                safe_for_production: false,
            },
            Arc::new(DbTool::new(DbOp::Migrate, sql.clone())),
        );
        builder.register(
            ToolSpec {
                name: "db_list_tables".into(),
                description: "List the tables visible to the configured database user.".into(),
                input_schema: object_schema(json!({}), &[]),
                required_roles: everyone.clone(),
                safe_for_production: true,
            },
            Arc::new(DbTool::new(DbOp::ListTables, sql)),
        );

        for (name, op, roles, safe) in [
            ("rest_get", RestOp::Get, everyone.clone(), true),
            ("rest_post", RestOp::Post, dev_up.clone(), true),
            ("rest_put", RestOp::Put, dev_up.clone(), true),
            ("rest_delete", RestOp::Delete, operator_up.clone(), false),
        ] {
            builder.register(
                ToolSpec {
                    name: name.into(),
                    description: format!(
                        "Send an HTTP {} request to a URL with optional headers and JSON body.",
                        name.trim_start_matches("rest_").to_uppercase()
                    ),
                    input_schema: object_schema(
                        json!({
                            "url": { "type": "string" },
                            "headers": { "type": "object" },
                            "body": {}
                        }),
                        &["url"],
                    ),
                    required_roles: roles,
                    safe_for_production: safe,
                },
                Arc::new(RestTool::new(op, http.clone())),
            );
        }

        builder.register(
            ToolSpec {
                name: "fs_read_file".into(),
                description: "Read a text file under the allowed filesystem root.".into(),
                input_schema: object_schema(json!({ "path": { "type": "string" } }), &["path"]),
                required_roles: everyone.clone(),
                safe_for_production: true,
            },
            Arc::new(FsTool::new(FsOp::ReadFile, fs_root.clone())),
        );
        builder.register(
            ToolSpec {
                name: "fs_write_file".into(),
                description: "Write a text file under the allowed filesystem root.".into(),
                input_schema: object_schema(
                    json!({
                        "path": { "type": "string" },
                        "content": { "type": "string" }
                    }),
                    &["path", "content"],
                ),
                required_roles: dev_up.clone(),
                safe_for_production: false,
            },
            Arc::new(FsTool::new(FsOp::WriteFile, fs_root.clone())),
        );
        builder.register(
            ToolSpec {
                name: "fs_list_dir".into(),
                description: "List directory entries under the allowed filesystem root.".into(),
                input_schema: object_schema(json!({ "path": { "type": "string" } }), &[]),
                required_roles: everyone.clone(),
                safe_for_production: true,
            },
            Arc::new(FsTool::new(FsOp::ListDir, fs_root)),
        );

        for (name, op, description) in [
            (
                "git_status",
                GitOp::Status,
                "Show working-tree status of a repository.",
            ),
            (
                "git_log",
                GitOp::Log,
                "Show recent commits of a repository.",
            ),
            (
                "git_diff",
                GitOp::Diff,
                "Show uncommitted changes of a repository.",
            ),
        ] {
            builder.register(
                ToolSpec {
                    name: name.into(),
                    description: description.into(),
                    input_schema: object_schema(
                        json!({
                            "repo_path": { "type": "string" },
                            "path": { "type": "string" },
                            "limit": { "type": "integer" }
                        }),
                        &[],
                    ),
                    required_roles: everyone.clone(),
                    safe_for_production: true,
                },
                Arc::new(GitTool::new(op)),
            );
        }

        builder.register(
            ToolSpec {
                name: "kv_get".into(),
                description: "Read a value from the key-value store.".into(),
                input_schema: object_schema(json!({ "key": { "type": "string" } }), &["key"]),
                required_roles: everyone.clone(),
                safe_for_production: true,
            },
            Arc::new(KvTool::new(KvOp::Get, kv.clone())),
        );
        builder.register(
            ToolSpec {
                name: "kv_set".into(),
                description: "Store a value in the key-value store.".into(),
                input_schema: object_schema(
                    json!({ "key": { "type": "string" }, "value": {} }),
                    &["key", "value"],
                ),
                required_roles: dev_up.clone(),
                safe_for_production: true,
            },
            Arc::new(KvTool::new(KvOp::Set, kv.clone())),
        );
        builder.register(
            ToolSpec {
                name: "queue_push".into(),
                description: "Push a value onto a FIFO queue.".into(),
                input_schema: object_schema(
                    json!({ "queue": { "type": "string" }, "value": {} }),
                    &["queue", "value"],
                ),
                required_roles: dev_up.clone(),
                safe_for_production: true,
            },
            Arc::new(KvTool::new(KvOp::QueuePush, kv.clone())),
        );
        builder.register(
            ToolSpec {
                name: "queue_pop".into(),
                description: "Pop the oldest value from a FIFO queue.".into(),
                input_schema: object_schema(json!({ "queue": { "type": "string" } }), &["queue"]),
                required_roles: dev_up.clone(),
                safe_for_production: true,
            },
            Arc::new(KvTool::new(KvOp::QueuePop, kv)),
        );

        builder.register(
            ToolSpec {
                name: "web_fetch_json".into(),
                description: "Fetch a URL and parse the response as JSON.".into(),
                input_schema: object_schema(json!({ "url": { "type": "string" } }), &["url"]),
                required_roles: everyone.clone(),
                safe_for_production: true,
            },
            Arc::new(WebTool::new(WebOp::FetchJson, http.clone())),
        );
        builder.register(
            ToolSpec {
                name: "web_search".into(),
                description: "Best-effort web search; returns titles, URLs, and snippets.".into(),
                input_schema: object_schema(json!({ "query": { "type": "string" } }), &["query"]),
                required_roles: everyone,
                safe_for_production: true,
            },
            Arc::new(WebTool::new(WebOp::Search, http)),
        );

        builder.build()
    }

    /// Catalog with explicit entries, for tests.
    pub fn with_tools(entries: Vec<(ToolSpec, Arc<dyn ToolInvoker>)>) -> Self {
        let mut builder = CatalogBuilder::default();
        for (spec, invoker) in entries {
            builder.register(spec, invoker);
        }
        builder.build()
    }

    pub fn all(&self) -> Vec<&ToolSpec> {
        self.tools.iter().map(|tool| &tool.spec).collect()
    }

    pub fn by_name(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i].spec)
    }

    pub fn invoker(&self, name: &str) -> Option<Arc<dyn ToolInvoker>> {
        self.index.get(name).map(|&i| self.tools[i].invoker.clone())
    }

    /// Tools callable by `role`, optionally restricted to production-safe
    /// entries.
    pub fn for_role(&self, role: Role, production_safe_mode: bool) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|tool| &tool.spec)
            .filter(|spec| spec.required_roles.contains(&role))
            .filter(|spec| !production_safe_mode || spec.safe_for_production)
            .cloned()
            .collect()
    }

    /// Projects specs into the descriptor shape the model expects.
    pub fn to_model_tools(specs: &[ToolSpec]) -> Vec<Value> {
        specs
            .iter()
            .map(|spec| {
                json!({
                    "type": "function",
                    "function": {
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": spec.input_schema,
                    }
                })
            })
            .collect()
    }
}

#[derive(Default)]
struct CatalogBuilder {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl CatalogBuilder {
    fn register(&mut self, spec: ToolSpec, invoker: Arc<dyn ToolInvoker>) {
        debug_assert!(
            !self.index.contains_key(&spec.name),
            "duplicate tool name {}",
            spec.name
        );
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool { spec, invoker });
    }

    fn build(self) -> ToolCatalog {
        ToolCatalog {
            tools: self.tools,
            index: self.index,
        }
    }
}

fn roles_at_least(min: Role) -> Vec<Role> {
    [Role::Readonly, Role::Dev, Role::Operator, Role::Admin]
        .into_iter()
        .filter(|role| *role >= min)
        .collect()
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
