use super::{optional_str, InvokeError, ToolInvoker};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use tokio::process::Command;

#[derive(Debug, Clone, Copy)]
pub enum GitOp {
    Status,
    Log,
    Diff,
}

/// Git tools shell out to the `git` binary in the requested repository.
/// The executor substitutes the process working directory when the
/// supplied `repo_path` is unusable, so the path here is already vetted.
pub struct GitTool {
    op: GitOp,
}

impl GitTool {
    pub fn new(op: GitOp) -> Self {
        Self { op }
    }

    async fn run(&self, repo: &Path, args: &[&str]) -> Result<Value, InvokeError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(args)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        if !output.status.success() {
            let detail = if stderr.is_empty() { stdout } else { stderr };
            return Err(InvokeError::message(format!("git failed: {detail}")));
        }
        Ok(json!({
            "repo_path": repo.display().to_string(),
            "output": stdout,
        }))
    }
}

#[async_trait]
impl ToolInvoker for GitTool {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError> {
        let repo = Path::new(optional_str(&args, "repo_path").unwrap_or("."));
        match self.op {
            GitOp::Status => self.run(repo, &["status", "--short", "--branch"]).await,
            GitOp::Log => {
                let limit = args
                    .get("limit")
                    .and_then(Value::as_u64)
                    .unwrap_or(10)
                    .clamp(1, 100);
                let count = format!("-{limit}");
                self.run(repo, &["log", "--oneline", &count]).await
            }
            GitOp::Diff => match optional_str(&args, "path") {
                Some(path) => self.run(repo, &["diff", "--stat", "--", path]).await,
                None => self.run(repo, &["diff", "--stat"]).await,
            },
        }
    }
}
