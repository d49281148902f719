use super::{required_str, InvokeError, ToolInvoker};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Seam for the SQL connector. The service only ever needs these four
/// operations; a deployment substitutes a real database client here.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Value, InvokeError>;
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Value, InvokeError>;
    async fn migrate(&self, sql: &str) -> Result<Value, InvokeError>;
    async fn list_tables(&self) -> Result<Value, InvokeError>;
}

#[derive(Debug, Clone, Copy)]
pub enum DbOp {
    Query,
    Execute,
    Migrate,
    ListTables,
}

pub struct DbTool {
    op: DbOp,
    backend: Arc<dyn SqlBackend>,
}

impl DbTool {
    pub fn new(op: DbOp, backend: Arc<dyn SqlBackend>) -> Self {
        Self { op, backend }
    }
}

#[async_trait]
impl ToolInvoker for DbTool {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError> {
        match self.op {
            DbOp::Query => {
                let sql = required_str(&args, "sql")?;
                let params = param_list(&args);
                self.backend.query(sql, &params).await
            }
            DbOp::Execute => {
                let sql = required_str(&args, "sql")?;
                let params = param_list(&args);
                self.backend.execute(sql, &params).await
            }
            DbOp::Migrate => {
                let sql = required_str(&args, "sql")?;
                self.backend.migrate(sql).await
            }
            DbOp::ListTables => self.backend.list_tables().await,
        }
    }
}

fn param_list(args: &Value) -> Vec<Value> {
    args.get("params")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// In-memory development backend. Records every statement and tracks
/// tables created through migrations; queries answer with empty row sets.
pub struct MemorySqlBackend {
    state: Mutex<MemoryDbState>,
}

#[derive(Default)]
struct MemoryDbState {
    tables: BTreeMap<String, u64>,
    statements: Vec<String>,
}

impl MemorySqlBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryDbState::default()),
        }
    }

    pub fn statement_log(&self) -> Vec<String> {
        self.state.lock().expect("db state lock").statements.clone()
    }
}

impl Default for MemorySqlBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SqlBackend for MemorySqlBackend {
    async fn query(&self, sql: &str, params: &[Value]) -> Result<Value, InvokeError> {
        let mut state = self.state.lock().expect("db state lock");
        state.statements.push(sql.to_string());
        Ok(json!({
            "rows": [],
            "row_count": 0,
            "sql": sql,
            "params": params,
        }))
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<Value, InvokeError> {
        let mut state = self.state.lock().expect("db state lock");
        state.statements.push(sql.to_string());
        if let Some(table) = table_of(sql, "insert into") {
            *state.tables.entry(table).or_insert(0) += 1;
        }
        Ok(json!({
            "affected_rows": 1,
            "sql": sql,
            "params": params,
        }))
    }

    async fn migrate(&self, sql: &str) -> Result<Value, InvokeError> {
        let mut state = self.state.lock().expect("db state lock");
        state.statements.push(sql.to_string());
        if let Some(table) = table_of(sql, "create table") {
            state.tables.entry(table).or_insert(0);
        }
        Ok(json!({ "applied": true, "sql": sql }))
    }

    async fn list_tables(&self) -> Result<Value, InvokeError> {
        let state = self.state.lock().expect("db state lock");
        let tables: Vec<&String> = state.tables.keys().collect();
        Ok(json!({ "tables": tables }))
    }
}

fn table_of(sql: &str, prefix: &str) -> Option<String> {
    let lowered = sql.trim_start().to_lowercase();
    let rest = lowered.strip_prefix(prefix)?.trim_start();
    let rest = rest.strip_prefix("if not exists").unwrap_or(rest).trim_start();
    let name: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrate_then_list_reports_table() {
        let backend = MemorySqlBackend::new();
        backend
            .migrate("CREATE TABLE gold (price REAL)")
            .await
            .unwrap();
        let tables = backend.list_tables().await.unwrap();
        assert_eq!(tables["tables"][0], "gold");
    }

    #[tokio::test]
    async fn query_tool_requires_sql_argument() {
        let tool = DbTool::new(DbOp::Query, Arc::new(MemorySqlBackend::new()));
        let err = tool.invoke(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("sql"));
    }

    #[tokio::test]
    async fn statements_are_recorded_in_order() {
        let backend = Arc::new(MemorySqlBackend::new());
        let tool = DbTool::new(DbOp::Execute, backend.clone());
        tool.invoke(json!({"sql": "INSERT INTO gold(price) VALUES (?)", "params": [2650.5]}))
            .await
            .unwrap();
        assert_eq!(backend.statement_log().len(), 1);
    }
}
