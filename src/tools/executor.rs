//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，execute(tool_name, args) 在超时内调用 registry.execute，
//! 超时或失败时转为 AgentError（ToolTimeout / ToolExecutionFailed / HallucinatedTool）；
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{Tool, ToolRegistry};

/// 默认单次工具超时（秒）
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
#[derive(Clone)]
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 覆盖单次调用超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 执行指定工具；未注册的名字返回 HallucinatedTool；long_running 工具不加超时
    pub async fn execute(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<String, AgentError> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| AgentError::HallucinatedTool(tool_name.to_string()))?;

        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = if tool.long_running() {
            Ok(tool.execute(args).await)
        } else {
            timeout(self.timeout, tool.execute(args)).await
        };

        let (ok, outcome): (bool, &str) = match &result {
            Ok(Ok(_)) => (true, "ok"),
            Ok(Err(_)) => (false, "error"),
            Err(_) => (false, "timeout"),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(e)) => Err(AgentError::ToolExecutionFailed(e)),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Slow {
        long: bool,
    }

    #[async_trait]
    impl Tool for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        fn long_running(&self) -> bool {
            self.long
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok("done".to_string())
        }
    }

    struct Failing;

    #[async_trait]
    impl Tool for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        async fn execute(&self, _args: Value) -> Result<String, String> {
            Err("upstream 500".to_string())
        }
    }

    fn executor_with(tool: impl Tool + 'static) -> ToolExecutor {
        let mut reg = ToolRegistry::new();
        reg.register(tool);
        ToolExecutor::new(reg, 1).with_timeout(Duration::from_millis(50))
    }

    #[tokio::test]
    async fn test_unknown_tool_is_hallucinated() {
        let exec = ToolExecutor::new(ToolRegistry::new(), 1);
        let err = exec.execute("nope", Value::Null).await.unwrap_err();
        assert!(matches!(err, AgentError::HallucinatedTool(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_tool_error_mapped() {
        let exec = executor_with(Failing);
        let err = exec.execute("failing", Value::Null).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecutionFailed(msg) if msg == "upstream 500"));
    }

    #[tokio::test]
    async fn test_timeout_applies_to_short_tools_only() {
        let exec = executor_with(Slow { long: false });
        let err = exec.execute("slow", Value::Null).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(_)));

        let exec = executor_with(Slow { long: true });
        assert_eq!(exec.execute("slow", Value::Null).await.unwrap(), "done");
    }
}
