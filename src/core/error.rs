//! Agent 错误类型与恢复动作
//!
//! 与 RecoveryEngine 配合：根据 AgentError 决定 RetryWithPrompt / ReportToModel / Abort。
//! 只有配置错误与协调者不收敛会作为运行失败交给外部调用方。

use thiserror::Error;

use crate::config::ConfigError;
use crate::llm::LlmError;

/// 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Unknown worker: {0}")]
    UnknownWorker(String),

    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),

    /// 协调者在回合上限内没有给出最终回复
    #[error("Coordinator did not converge within {turns} turns")]
    DidNotConverge { turns: usize },
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryAction {
    /// 将提示注入下一轮，让 LLM 重试（如 JSON 格式错误）
    RetryWithPrompt(String),
    /// 作为工具结果写回历史，交给模型自行处理（如未知工具）
    ReportToModel(String),
    /// 终止当前执行
    Abort,
}
