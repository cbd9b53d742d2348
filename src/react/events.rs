//! 运行过程事件：回合、工具调用、观察、委派起止与最终回复
//!
//! 通过可选的 mpsc 通道推送；没有订阅者时事件被直接丢弃。

use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Observation 预览最大字符数
pub const PREVIEW_CHARS: usize = 200;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// 协调者回合开始
    TurnStarted { turn: usize, limit: usize },
    /// 调用工具
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    /// 工具返回（预览）
    Observation { tool: String, preview: String },
    /// 工具执行失败
    ToolFailure { tool: String, reason: String },
    /// 错误恢复动作
    Recovery { action: String, detail: String },
    /// 子智能体已提交（尚未拿到并发许可）
    DelegationStarted {
        id: String,
        worker: String,
        description: String,
    },
    /// 子智能体结束
    DelegationFinished {
        id: String,
        worker: String,
        outcome: String,
        iterations: usize,
    },
    /// 最终回复
    FinalAnswer { text: String },
    /// 错误
    Error { text: String },
}

/// 事件发送端；未设置通道时 emit 为空操作
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<UnboundedSender<RunEvent>>,
}

impl EventSink {
    pub fn new(tx: Option<UnboundedSender<RunEvent>>) -> Self {
        Self { tx }
    }

    pub fn emit(&self, ev: RunEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ev);
        }
    }
}

/// 截断为预览文本
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let ev = RunEvent::TurnStarted { turn: 1, limit: 50 };
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["type"], "turn_started");
        assert_eq!(v["limit"], 50);
    }

    #[test]
    fn test_sink_without_channel_is_noop() {
        EventSink::default().emit(RunEvent::FinalAnswer { text: "x".into() });
    }

    #[tokio::test]
    async fn test_sink_forwards() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink = EventSink::new(Some(tx));
        sink.emit(RunEvent::Error { text: "boom".into() });
        assert_eq!(rx.recv().await, Some(RunEvent::Error { text: "boom".into() }));
    }

    #[test]
    fn test_preview_truncates() {
        let long = "a".repeat(PREVIEW_CHARS + 5);
        assert!(preview(&long).ends_with("..."));
        assert_eq!(preview("short"), "short");
    }
}
