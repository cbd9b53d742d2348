//! 提示词：协调者 / 子智能体 system prompt 与摘要提示
//!
//! 优先读取 config/prompts/*.md（可覆盖内置文本），占位符 {date}、{max_concurrent_units}、
//! {max_iterations} 在加载后统一替换。

use crate::tools::schema::tool_call_schema_json;

const TODO_USAGE: &str = "\
Use write_todos to keep a short ordered plan of the work. Mark an item in_progress \
before you start it and completed as soon as it is done. write_todos replaces the \
whole list, so always send every item. Use read_todos to re-read the plan.";

const FILE_USAGE: &str = "\
The workspace is a virtual file system shared by this run. Save the user's request \
and long intermediate results to files with write_file instead of repeating them in \
the conversation; use ls and read_file to get them back when you need them.";

const DELEGATION_USAGE: &str = "\
Delegate self-contained units of work with the task tool: \
{\"tool\": \"task\", \"args\": {\"description\": \"...\", \"subagent_type\": \"<worker>\"}}. \
A worker sees only the description you give it, so make it complete. You may issue up \
to {max_concurrent_units} task calls in one reply (a JSON array) and they run in parallel; \
each worker stops after {max_iterations} reasoning steps. Today is {date}.";

const RESEARCHER: &str = "\
You are a research assistant. Today is {date}. Research the single topic you were \
given: search for information, use think after each search to note what you found and \
what is still missing, and stop as soon as you can answer well. Reply with a concise \
summary of your findings, citing the URLs you used.";

const SUMMARIZE: &str = "\
Summarize the following web content in a few short paragraphs. Keep key facts, \
numbers and names; drop navigation and boilerplate.\n\n";

const TOOL_PROTOCOL: &str = "\
To call tools, reply with only JSON: one object {\"tool\": \"<name>\", \"args\": {...}} \
or an array of such objects. To finish, reply with your final answer as plain text \
without any JSON.";

fn load_override(name: &str) -> Option<String> {
    [
        format!("config/prompts/{name}.md"),
        format!("../config/prompts/{name}.md"),
    ]
    .into_iter()
    .find_map(|p| std::fs::read_to_string(p).ok())
    .filter(|s| !s.trim().is_empty())
}

/// 当天日期（如 "Mon Oct 19, 2026"）
pub fn today() -> String {
    chrono::Local::now().format("%a %b %-d, %Y").to_string()
}

fn fill(template: &str, max_concurrent_units: usize, max_iterations: usize) -> String {
    template
        .replace("{date}", &today())
        .replace("{max_concurrent_units}", &max_concurrent_units.to_string())
        .replace("{max_iterations}", &max_iterations.to_string())
}

/// 协调者 system prompt：使用说明 + 子智能体列表 + 工具 schema + 调用协议
pub fn coordinator_prompt(
    tools_schema: &str,
    workers: &str,
    max_concurrent_units: usize,
    max_iterations: usize,
) -> String {
    let rule = "=".repeat(80);
    let base = load_override("coordinator").unwrap_or_else(|| {
        format!(
            "# TODO MANAGEMENT\n{TODO_USAGE}\n\n{rule}\n\n# FILE SYSTEM USAGE\n{FILE_USAGE}\n\n{rule}\n\n# SUB-AGENT DELEGATION\n{DELEGATION_USAGE}"
        )
    });
    format!(
        "{}\n\nAvailable workers:\n{}\n\nAvailable tools:\n{}\n\n{}\n\nTool call JSON schema:\n{}",
        fill(&base, max_concurrent_units, max_iterations),
        workers,
        tools_schema,
        TOOL_PROTOCOL,
        tool_call_schema_json()
    )
}

/// 子智能体 system prompt：种子提示 + 可用工具 + 调用协议
pub fn worker_prompt(seed: &str, tools_schema: &str) -> String {
    format!("{seed}\n\nAvailable tools:\n{tools_schema}\n\n{TOOL_PROTOCOL}")
}

/// 内置 research-agent 的种子提示
pub fn researcher_prompt() -> String {
    let base = load_override("researcher").unwrap_or_else(|| RESEARCHER.to_string());
    fill(&base, 0, 0)
}

pub fn summarize_prompt(content: &str) -> String {
    format!("{SUMMARIZE}{content}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinator_prompt_carries_limits() {
        let p = coordinator_prompt("[]", "- research-agent: research", 4, 2);
        assert!(p.contains("up to 4 task calls"));
        assert!(p.contains("after 2 reasoning steps"));
        assert!(p.contains("research-agent"));
        assert!(!p.contains("{date}"));
    }

    #[test]
    fn test_worker_prompt_has_protocol() {
        let p = worker_prompt("seed text", "[]");
        assert!(p.starts_with("seed text"));
        assert!(p.contains("\"tool\""));
    }
}
