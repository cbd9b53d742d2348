//! Planner：调用 LLM 并把回复解析为最终回答或一组 Tool Call
//!
//! 文本协议：单个 {"tool": "...", "args": {...}}，或由这类对象组成的 JSON 数组，前后可以带说明文字；
//! 不含 "tool" 字段的回复一律视为最终回答。

use std::sync::Arc;

use serde_json::Value;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::{Message, ToolCall};

/// Planner 输出
#[derive(Debug, Clone, PartialEq)]
pub enum PlannerOutput {
    /// 最终回答
    Response(String),
    /// 本回合要执行的工具调用（按发出顺序）
    ToolCalls(Vec<ToolCall>),
}

/// 截取 ```json 围栏内的内容；没有围栏时返回原文
fn fenced(text: &str) -> &str {
    match text.find("```json") {
        Some(start) => {
            let rest = &text[start + 7..];
            rest.find("```").map(|end| &rest[..end]).unwrap_or(rest).trim()
        }
        None => text,
    }
}

fn looks_like_calls(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key("tool"),
        Value::Array(items) => items.first().map_or(true, Value::is_object),
        _ => false,
    }
}

/// 从首个 `[` 或 `{` 起流式解析一个 JSON 值，忽略前后的说明文字；
/// 没有可解析的候选时返回 None；候选都解析失败时返回第一个错误
fn extract_json(text: &str) -> Result<Option<Value>, String> {
    let mut first_err = None;
    for (idx, _) in text.match_indices(|c| c == '[' || c == '{') {
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value)) if looks_like_calls(&value) => return Ok(Some(value)),
            Some(Ok(_)) | None => {}
            Some(Err(e)) => {
                first_err.get_or_insert_with(|| format!("{e}: {}", &text[idx..]));
            }
        }
    }
    first_err.map_or(Ok(None), Err)
}

fn to_call(value: Value) -> Result<ToolCall, String> {
    let mut call: ToolCall = serde_json::from_value(value).map_err(|e| e.to_string())?;
    if call.tool.trim().is_empty() {
        return Err("empty tool name".to_string());
    }
    if call.args.is_null() {
        call.args = Value::Object(Default::default());
    }
    Ok(call)
}

/// 解析 LLM 输出
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();
    let candidate = fenced(trimmed);
    if !candidate.contains("\"tool\"") {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    }

    let value = match extract_json(candidate).map_err(AgentError::JsonParseError)? {
        Some(value) => value,
        None => return Ok(PlannerOutput::Response(trimmed.to_string())),
    };
    let json_str = value.to_string();
    let calls = match value {
        Value::Array(items) if items.is_empty() => {
            return Err(AgentError::JsonParseError("empty tool call array".to_string()))
        }
        Value::Array(items) => items
            .into_iter()
            .map(to_call)
            .collect::<Result<Vec<_>, _>>(),
        other => to_call(other).map(|c| vec![c]),
    }
    .map_err(|e| AgentError::JsonParseError(format!("{e}: {json_str}")))?;

    Ok(PlannerOutput::ToolCalls(calls))
}

/// Planner：持有 LLM，把完整历史（含 system）交给模型
#[derive(Clone)]
pub struct Planner {
    llm: Arc<dyn LlmClient>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 调用 LLM，返回原始回复文本
    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        Ok(self.llm.complete(messages).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use serde_json::json;

    #[test]
    fn test_plain_text_is_response() {
        let out = parse_llm_output("  The answer is 42. [1] see notes  ").unwrap();
        assert_eq!(out, PlannerOutput::Response("The answer is 42. [1] see notes".to_string()));
    }

    #[test]
    fn test_single_call() {
        let out = parse_llm_output(r#"{"tool": "ls", "args": {}}"#).unwrap();
        let PlannerOutput::ToolCalls(calls) = out else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool, "ls");
    }

    #[test]
    fn test_array_keeps_issuance_order() {
        let raw = r#"[
            {"tool": "task", "args": {"description": "A", "subagent_type": "research-agent"}},
            {"tool": "task", "args": {"description": "B", "subagent_type": "research-agent"}}
        ]"#;
        let PlannerOutput::ToolCalls(calls) = parse_llm_output(raw).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].args["description"], "A");
        assert_eq!(calls[1].args["description"], "B");
    }

    #[test]
    fn test_fenced_json_and_missing_args() {
        let raw = "I will think first.\n```json\n{\"tool\": \"read_todos\"}\n```";
        let PlannerOutput::ToolCalls(calls) = parse_llm_output(raw).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].args, json!({}));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_llm_output(r#"{"tool": "ls", "args": {"path": }}"#).unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
        let err = parse_llm_output(r#"[{"tool": ""}]"#).unwrap_err();
        assert!(matches!(err, AgentError::JsonParseError(_)));
    }

    #[test]
    fn test_prose_before_array_batch() {
        let raw = "I'll research both topics in parallel:\n[\
            {\"tool\": \"task\", \"args\": {\"description\": \"A\", \"subagent_type\": \"research-agent\"}}, \
            {\"tool\": \"task\", \"args\": {\"description\": \"B\", \"subagent_type\": \"research-agent\"}}]";
        let PlannerOutput::ToolCalls(calls) = parse_llm_output(raw).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].args["description"], "A");
        assert_eq!(calls[1].args["description"], "B");
    }

    #[test]
    fn test_array_with_trailing_prose() {
        let raw = r#"[{"tool": "ls", "args": {}}, {"tool": "read_todos", "args": {}}]
Then I will summarize {what I find}."#;
        let PlannerOutput::ToolCalls(calls) = parse_llm_output(raw).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].tool, "read_todos");
    }

    #[test]
    fn test_quoted_tool_word_without_json_is_response() {
        let raw = r#"The "tool" field names the action; no call is needed."#;
        assert!(matches!(parse_llm_output(raw).unwrap(), PlannerOutput::Response(_)));
    }

    #[test]
    fn test_bracketed_prose_before_single_call() {
        let raw = r#"Step [1]: list files {"tool": "ls", "args": {}}"#;
        let PlannerOutput::ToolCalls(calls) = parse_llm_output(raw).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].tool, "ls");
    }

    #[tokio::test]
    async fn test_plan_maps_llm_error() {
        let planner = Planner::new(Arc::new(ScriptedLlmClient::new(Vec::<String>::new())));
        let err = planner.plan(&[Message::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AgentError::LlmError(_)));
    }
}
