//! 状态层：对话历史、任务清单、虚拟工作区
//!
//! SharedState 由一次运行独占；history 只属于当前执行者，todos / files 以句柄形式
//! 显式交给工具，是跨上下文通信的唯一通道。

pub mod conversation;
pub mod todos;
pub mod workspace;

pub use conversation::{Message, Role, ToolCall};
pub use todos::{Todo, TodoBoard, TodoList, TodoStatus};
pub use workspace::{FileEntry, VirtualFs, Workspace};

/// 一次运行的共享状态
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    pub history: Vec<Message>,
    pub todos: TodoBoard,
    pub files: Workspace,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.history.push(msg);
    }

    /// 最近 n 条工具结果（按时间正序），用于迭代耗尽时拼部分结果
    pub fn recent_tool_results(&self, n: usize) -> Vec<&Message> {
        let mut out: Vec<&Message> = self
            .history
            .iter()
            .rev()
            .filter(|m| m.is_tool_result())
            .take(n)
            .collect();
        out.reverse();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_tool_results_in_order() {
        let mut state = SharedState::new();
        state.push(Message::user("task"));
        state.push(Message::tool("search", "one"));
        state.push(Message::assistant("thinking"));
        state.push(Message::tool("think", "two"));
        state.push(Message::tool("search", "three"));
        let recent: Vec<&str> = state
            .recent_tool_results(2)
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(recent, vec!["two", "three"]);
    }
}
