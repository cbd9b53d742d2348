//! Think 工具：记录一段反思，无副作用（结果只进入调用方历史）

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::Tool;

/// Think 工具：回显反思内容
pub struct ThinkTool;

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "think"
    }

    fn description(&self) -> &str {
        "Record a short strategic reflection on progress, gaps and next steps. \
         Args: {\"reflection\": \"text\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "reflection": {"type": "string", "description": "Your reflection"}
            },
            "required": ["reflection"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let text = args
            .get("reflection")
            .and_then(|v| v.as_str())
            .ok_or("missing required argument 'reflection'")?;
        Ok(format!("Reflection recorded: {}", text))
    }
}
