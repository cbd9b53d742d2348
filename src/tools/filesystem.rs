//! 虚拟文件系统工具
//!
//! LsTool / ReadFileTool / WriteFileTool 绑定同一个 Workspace 句柄，
//! 读写的是本次运行的内存文件表，不触碰真实磁盘。

use async_trait::async_trait;
use serde_json::Value;

use crate::memory::Workspace;
use crate::tools::Tool;

/// read_file 默认最多返回的行数
const DEFAULT_READ_LIMIT: usize = 2000;
/// 单行最多保留的字符数
const MAX_LINE_CHARS: usize = 2000;

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing required argument '{key}'"))
}

fn optional_usize(args: &Value, key: &str, default: usize) -> usize {
    args.get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// 按行切片并加行号（cat -n 风格，行号从 1 开始）
pub fn number_lines(content: &str, offset: usize, limit: usize) -> String {
    content
        .lines()
        .enumerate()
        .skip(offset)
        .take(limit)
        .map(|(i, line)| {
            let line: String = line.chars().take(MAX_LINE_CHARS).collect();
            format!("{:6}\t{}", i + 1, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ls 工具：列出工作区文件（按写入顺序）
pub struct LsTool {
    workspace: Workspace,
}

impl LsTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        "ls"
    }

    fn description(&self) -> &str {
        "List all files in the virtual workspace. Args: {}"
    }

    async fn execute(&self, _args: Value) -> Result<String, String> {
        let paths = self.workspace.list().await;
        tracing::info!(count = paths.len(), "ls tool execute");
        if paths.is_empty() {
            Ok("(workspace is empty)".to_string())
        } else {
            Ok(paths.join("\n"))
        }
    }
}

/// ReadFile 工具：读取文件，支持 offset / limit（按行）
pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file from the virtual workspace with line numbers. \
         Args: {\"path\": \"notes.md\", \"offset\": 0, \"limit\": 2000}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "offset": {"type": "integer", "minimum": 0},
                "limit": {"type": "integer", "minimum": 1}
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let path = required_str(&args, "path")?;
        let offset = optional_usize(&args, "offset", 0);
        let limit = optional_usize(&args, "limit", DEFAULT_READ_LIMIT).max(1);
        tracing::info!(path = %path, offset, limit, "read_file tool execute");

        let content = self
            .workspace
            .read(path)
            .await
            .ok_or_else(|| format!("File '{path}' not found"))?;
        if content.trim().is_empty() {
            return Ok("System reminder: File exists but has empty contents".to_string());
        }
        let total = content.lines().count();
        if offset >= total {
            return Err(format!(
                "Line offset {offset} exceeds file length ({total} lines)"
            ));
        }
        Ok(number_lines(&content, offset, limit))
    }
}

/// WriteFile 工具：整体写入（覆盖）文件
pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Create or overwrite a file in the virtual workspace. \
         Args: {\"path\": \"notes.md\", \"content\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let path = required_str(&args, "path")?;
        let content = required_str(&args, "content")?;
        if path.trim().is_empty() {
            return Err("path must not be empty".to_string());
        }
        tracing::info!(path = %path, bytes = content.len(), "write_file tool execute");
        self.workspace.write(path, content).await;
        Ok(format!("Updated file {path}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_read_ls_roundtrip() {
        let ws = Workspace::new();
        let write = WriteFileTool::new(ws.clone());
        let read = ReadFileTool::new(ws.clone());
        let ls = LsTool::new(ws.clone());

        assert_eq!(ls.execute(json!({})).await.unwrap(), "(workspace is empty)");
        write
            .execute(json!({"path": "plan.md", "content": "line one\nline two"}))
            .await
            .unwrap();
        let out = read.execute(json!({"path": "plan.md"})).await.unwrap();
        assert_eq!(out, "     1\tline one\n     2\tline two");
        assert_eq!(ls.execute(json!({})).await.unwrap(), "plan.md");
        assert_eq!(ws.read("plan.md").await.as_deref(), Some("line one\nline two"));
    }

    #[tokio::test]
    async fn test_read_missing_file_is_error() {
        let read = ReadFileTool::new(Workspace::new());
        let err = read.execute(json!({"path": "ghost.md"})).await.unwrap_err();
        assert!(err.contains("not found"));
    }

    #[tokio::test]
    async fn test_read_with_offset_and_limit() {
        let ws = Workspace::new();
        ws.write("n.txt", "a\nb\nc\nd").await;
        let read = ReadFileTool::new(ws);
        let out = read
            .execute(json!({"path": "n.txt", "offset": 1, "limit": 2}))
            .await
            .unwrap();
        assert_eq!(out, "     2\tb\n     3\tc");
        assert!(read
            .execute(json!({"path": "n.txt", "offset": 10}))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_read_empty_file_reminder() {
        let ws = Workspace::new();
        ws.write("empty.md", "").await;
        let out = ReadFileTool::new(ws)
            .execute(json!({"path": "empty.md"}))
            .await
            .unwrap();
        assert!(out.contains("empty contents"));
    }

    #[tokio::test]
    async fn test_write_requires_content() {
        let write = WriteFileTool::new(Workspace::new());
        assert!(write.execute(json!({"path": "a.md"})).await.is_err());
    }
}
