//! 任务清单：有序、带状态的计划条目
//!
//! 只支持整体替换（set）与读取（get），不校验状态迁移：清单记录的是声明的意图。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// 条目状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// 单个计划条目；序列化字段名为 content（与前端一致）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    #[serde(rename = "content", alias = "description")]
    pub description: String,
    pub status: TodoStatus,
}

impl Todo {
    pub fn new(description: impl Into<String>, status: TodoStatus) -> Self {
        Self {
            description: description.into(),
            status,
        }
    }

    pub fn pending(description: impl Into<String>) -> Self {
        Self::new(description, TodoStatus::Pending)
    }
}

/// 计划清单
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoList {
    items: Vec<Todo>,
}

impl TodoList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 整体替换，不与旧清单合并
    pub fn set(&mut self, todos: Vec<Todo>) {
        self.items = todos;
    }

    pub fn get(&self) -> &[Todo] {
        &self.items
    }

    /// 渲染为带序号的清单，供 read_todos 返回给模型
    pub fn render(&self) -> String {
        if self.items.is_empty() {
            return "No todos currently in the list.".to_string();
        }
        let mut s = String::from("Current TODO list:\n");
        for (i, todo) in self.items.iter().enumerate() {
            s.push_str(&format!("{}. [{}] {}\n", i + 1, todo.status, todo.description));
        }
        s.trim_end().to_string()
    }
}

/// 清单句柄：协调者与被授权的工具共享
#[derive(Debug, Clone, Default)]
pub struct TodoBoard {
    inner: Arc<RwLock<TodoList>>,
}

impl TodoBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, todos: Vec<Todo>) {
        tracing::debug!(count = todos.len(), "todo list replaced");
        self.inner.write().await.set(todos);
    }

    pub async fn get(&self) -> Vec<Todo> {
        self.inner.read().await.get().to_vec()
    }

    pub async fn render(&self) -> String {
        self.inner.read().await.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_without_merge() {
        let mut list = TodoList::new();
        list.set(vec![Todo::pending("a"), Todo::pending("b")]);
        let t2 = vec![Todo::new("c", TodoStatus::Completed)];
        list.set(t2.clone());
        assert_eq!(list.get(), t2.as_slice());
    }

    #[test]
    fn test_multiple_in_progress_allowed() {
        let mut list = TodoList::new();
        list.set(vec![
            Todo::new("a", TodoStatus::InProgress),
            Todo::new("b", TodoStatus::InProgress),
        ]);
        assert_eq!(list.get().len(), 2);
    }

    #[test]
    fn test_todo_wire_format() {
        let todo: Todo =
            serde_json::from_str(r#"{"content": "research A", "status": "in_progress"}"#).unwrap();
        assert_eq!(todo, Todo::new("research A", TodoStatus::InProgress));
        let alias: Todo =
            serde_json::from_str(r#"{"description": "x", "status": "pending"}"#).unwrap();
        assert_eq!(alias.description, "x");
    }

    #[test]
    fn test_render_empty_and_filled() {
        let mut list = TodoList::new();
        assert_eq!(list.render(), "No todos currently in the list.");
        list.set(vec![Todo::pending("draft outline")]);
        assert!(list.render().contains("1. [pending] draft outline"));
    }
}
