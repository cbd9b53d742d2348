//! 工具调用 JSON Schema 生成（schemars 自动生成）
//!
//! 用于将「合法 tool call」的 JSON 结构注入 system prompt，减少 LLM 输出格式错误。

use schemars::{schema_for, JsonSchema};

/// 单个工具调用：与 Planner 解析的 `{"tool": "...", "args": {...}}` 一致（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名，如 ls、read_file、write_todos、task
    pub tool: String,
    /// 工具参数，依工具不同而不同
    pub args: serde_json::Map<String, serde_json::Value>,
}

/// 一轮可以发起一个或多个调用（多个 task 委派会并发执行）
#[allow(dead_code)]
#[derive(JsonSchema)]
#[serde(untagged)]
enum TurnFormat {
    Single(ToolCallFormat),
    Batch(Vec<ToolCallFormat>),
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(TurnFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mentions_tool_and_args() {
        let s = tool_call_schema_json();
        assert!(s.contains("\"tool\""));
        assert!(s.contains("\"args\""));
        assert!(s.contains("anyOf"));
    }
}
