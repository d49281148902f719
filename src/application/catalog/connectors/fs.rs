use super::{optional_str, required_str, InvokeError, ToolInvoker};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

#[derive(Debug, Clone, Copy)]
pub enum FsOp {
    ReadFile,
    WriteFile,
    ListDir,
}

/// Filesystem tools rooted at the configured allowed path. Paths are
/// resolved relative to the root and may not escape it.
pub struct FsTool {
    op: FsOp,
    root: PathBuf,
}

impl FsTool {
    pub fn new(op: FsOp, root: PathBuf) -> Self {
        Self { op, root }
    }

    fn resolve(&self, raw: &str) -> Result<PathBuf, InvokeError> {
        let requested = Path::new(raw);
        let joined = if requested.is_absolute() {
            requested.to_path_buf()
        } else {
            self.root.join(requested)
        };

        // Normalize away `..` components without touching the disk, then
        // require the result to stay under the allowed root.
        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::ParentDir => {
                    normalized.pop();
                }
                Component::CurDir => {}
                other => normalized.push(other),
            }
        }
        if !normalized.starts_with(&self.root) {
            return Err(InvokeError::message(format!(
                "path '{raw}' is outside the allowed filesystem root"
            )));
        }
        Ok(normalized)
    }
}

#[async_trait]
impl ToolInvoker for FsTool {
    async fn invoke(&self, args: Value) -> Result<Value, InvokeError> {
        match self.op {
            FsOp::ReadFile => {
                let path = self.resolve(required_str(&args, "path")?)?;
                let content = fs::read_to_string(&path).await?;
                Ok(json!({
                    "path": path.display().to_string(),
                    "content": content,
                    "size": content.len(),
                }))
            }
            FsOp::WriteFile => {
                let path = self.resolve(required_str(&args, "path")?)?;
                let content = required_str(&args, "content")?;
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::write(&path, content).await?;
                Ok(json!({
                    "path": path.display().to_string(),
                    "bytes_written": content.len(),
                }))
            }
            FsOp::ListDir => {
                let raw = optional_str(&args, "path").unwrap_or(".");
                let path = self.resolve(raw)?;
                let mut entries = Vec::new();
                let mut reader = fs::read_dir(&path).await?;
                while let Some(entry) = reader.next_entry().await? {
                    let file_type = entry.file_type().await?;
                    entries.push(json!({
                        "name": entry.file_name().to_string_lossy(),
                        "is_dir": file_type.is_dir(),
                    }));
                }
                entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
                Ok(json!({
                    "path": path.display().to_string(),
                    "entries": entries,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let write = FsTool::new(FsOp::WriteFile, root.clone());
        let read = FsTool::new(FsOp::ReadFile, root);

        write
            .invoke(json!({"path": "notes/today.txt", "content": "gold at 2650"}))
            .await
            .unwrap();
        let result = read
            .invoke(json!({"path": "notes/today.txt"}))
            .await
            .unwrap();
        assert_eq!(result["content"], "gold at 2650");
    }

    #[tokio::test]
    async fn escaping_the_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tool = FsTool::new(FsOp::ReadFile, dir.path().to_path_buf());
        let err = tool
            .invoke(json!({"path": "../../etc/passwd"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("outside the allowed"));
    }

    #[tokio::test]
    async fn list_dir_reports_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let tool = FsTool::new(FsOp::ListDir, dir.path().to_path_buf());
        let result = tool.invoke(json!({})).await.unwrap();
        let entries = result["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "a.txt");
        assert_eq!(entries[1]["is_dir"], true);
    }
}
