//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供协调者与子智能体循环决定是重试、回报模型还是终止。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous reply was not valid JSON: {raw}. \
                 To call tools, reply with only a JSON object \
                 {{\"tool\": \"<name>\", \"args\": {{...}}}} or a JSON array of such objects. \
                 To finish, reply with plain text and no JSON."
            )),
            AgentError::HallucinatedTool(name) => RecoveryAction::ReportToModel(format!(
                "Error: unknown tool '{name}'. Use one of the tools listed in the system prompt."
            )),
            AgentError::UnknownWorker(name) => RecoveryAction::ReportToModel(format!(
                "Error: unknown worker '{name}'. Use one of the workers listed in the system prompt."
            )),
            AgentError::ToolTimeout(name) => {
                RecoveryAction::ReportToModel(format!("Error: tool '{name}' timed out"))
            }
            AgentError::ToolExecutionFailed(msg) => {
                RecoveryAction::ReportToModel(format!("Error: {msg}"))
            }
            AgentError::LlmError(_)
            | AgentError::ConfigError(_)
            | AgentError::DidNotConverge { .. } => RecoveryAction::Abort,
        }
    }
}
