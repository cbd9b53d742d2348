//! Task 工具：把一段自包含的工作委派给子智能体
//!
//! 子智能体只看到 description；返回值是它的单一结果文本。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::core::AgentError;
use crate::delegation::{DelegationOutcome, Delegator};
use crate::tools::Tool;

pub struct TaskTool {
    delegator: Arc<Delegator>,
    description: String,
}

impl TaskTool {
    pub fn new(delegator: Arc<Delegator>) -> Self {
        let description = format!(
            "Delegate a task to an isolated worker with a fresh context. \
             Args: {{\"description\": \"complete task description\", \"subagent_type\": \"<worker>\"}}. \
             Workers:\n{}",
            delegator.registry().describe()
        );
        Self {
            delegator,
            description,
        }
    }
}

#[async_trait]
impl Tool for TaskTool {
    fn name(&self) -> &str {
        "task"
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "description": {"type": "string"},
                "subagent_type": {"type": "string", "enum": self.delegator.registry().names()}
            },
            "required": ["description", "subagent_type"]
        })
    }

    /// 受迭代上限约束，不套用单次工具超时
    fn long_running(&self) -> bool {
        true
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let description = args
            .get("description")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .ok_or("missing required argument 'description'")?;
        let worker = args
            .get("subagent_type")
            .and_then(|v| v.as_str())
            .ok_or("missing required argument 'subagent_type'")?;

        match self.delegator.delegate(description, worker).await {
            Ok(result) => {
                if result.outcome == DelegationOutcome::Failed {
                    tracing::warn!(id = %result.id, worker = %result.worker, "delegation degraded");
                }
                Ok(result.content)
            }
            Err(AgentError::UnknownWorker(name)) => Err(format!(
                "unknown worker '{}'; available workers: {}",
                name,
                self.delegator.registry().names().join(", ")
            )),
            Err(e) => Err(e.to_string()),
        }
    }
}
