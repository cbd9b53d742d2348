//! 任务清单工具：write_todos 整体替换，read_todos 读取

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::memory::{Todo, TodoBoard};
use crate::tools::Tool;

#[derive(Deserialize)]
struct WriteTodosArgs {
    todos: Vec<Todo>,
}

/// WriteTodos 工具：用新的有序清单替换旧清单
pub struct WriteTodosTool {
    board: TodoBoard,
}

impl WriteTodosTool {
    pub fn new(board: TodoBoard) -> Self {
        Self { board }
    }
}

#[async_trait]
impl Tool for WriteTodosTool {
    fn name(&self) -> &str {
        "write_todos"
    }

    fn description(&self) -> &str {
        "Replace the whole TODO list. Status is one of pending, in_progress, completed. \
         Args: {\"todos\": [{\"content\": \"...\", \"status\": \"pending\"}]}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "todos": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "content": {"type": "string"},
                            "status": {"type": "string", "enum": ["pending", "in_progress", "completed"]}
                        },
                        "required": ["content", "status"]
                    }
                }
            },
            "required": ["todos"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let parsed: WriteTodosArgs =
            serde_json::from_value(args).map_err(|e| format!("invalid todos: {e}"))?;
        let rendered = serde_json::to_string(&parsed.todos).map_err(|e| e.to_string())?;
        tracing::info!(count = parsed.todos.len(), "write_todos tool execute");
        self.board.set(parsed.todos).await;
        Ok(format!("Updated todo list to {rendered}"))
    }
}

/// ReadTodos 工具：返回当前清单
pub struct ReadTodosTool {
    board: TodoBoard,
}

impl ReadTodosTool {
    pub fn new(board: TodoBoard) -> Self {
        Self { board }
    }
}

#[async_trait]
impl Tool for ReadTodosTool {
    fn name(&self) -> &str {
        "read_todos"
    }

    fn description(&self) -> &str {
        "Read the current TODO list. Args: {}"
    }

    async fn execute(&self, _args: Value) -> Result<String, String> {
        Ok(self.board.render().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::TodoStatus;
    use serde_json::json;

    #[tokio::test]
    async fn test_write_then_read_todos() {
        let board = TodoBoard::new();
        let write = WriteTodosTool::new(board.clone());
        let read = ReadTodosTool::new(board.clone());

        write
            .execute(json!({"todos": [
                {"content": "research A", "status": "in_progress"},
                {"content": "research B", "status": "pending"}
            ]}))
            .await
            .unwrap();
        write
            .execute(json!({"todos": [{"content": "write report", "status": "pending"}]}))
            .await
            .unwrap();

        assert_eq!(board.get().await, vec![Todo::new("write report", TodoStatus::Pending)]);
        let out = read.execute(json!({})).await.unwrap();
        assert!(out.contains("1. [pending] write report"));
        assert!(!out.contains("research A"));
    }

    #[tokio::test]
    async fn test_invalid_status_rejected() {
        let write = WriteTodosTool::new(TodoBoard::new());
        let err = write
            .execute(json!({"todos": [{"content": "x", "status": "done"}]}))
            .await
            .unwrap_err();
        assert!(err.starts_with("invalid todos"));
    }
}
