//! 子智能体注册表
//!
//! WorkerSpec 描述一个可委派的子智能体：名称、描述、种子提示与能力集合。
//! 能力是封闭枚举，不含“委派”，子智能体因此无法再派生子智能体。

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// 子智能体可被授予的能力
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerCapability {
    /// search 工具
    Search,
    /// think 工具
    Think,
    /// ls / read_file / write_file，作用于父级工作区
    Files,
    /// write_todos / read_todos，作用于父级任务清单
    Todos,
}

impl WorkerCapability {
    /// 能力对应的工具名
    pub fn tool_names(self) -> &'static [&'static str] {
        match self {
            WorkerCapability::Search => &["search"],
            WorkerCapability::Think => &["think"],
            WorkerCapability::Files => &["ls", "read_file", "write_file"],
            WorkerCapability::Todos => &["write_todos", "read_todos"],
        }
    }
}

impl fmt::Display for WorkerCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerCapability::Search => "search",
            WorkerCapability::Think => "think",
            WorkerCapability::Files => "files",
            WorkerCapability::Todos => "todos",
        };
        f.write_str(s)
    }
}

/// 一个子智能体的定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub capabilities: Vec<WorkerCapability>,
}

impl WorkerSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
        capabilities: Vec<WorkerCapability>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            prompt: prompt.into(),
            capabilities,
        }
    }

    /// 内置研究子智能体：search + think
    pub fn research_agent() -> Self {
        Self::new(
            "research-agent",
            "Delegate research to the sub-agent researcher. Only give this researcher one topic at a time.",
            crate::prompts::researcher_prompt(),
            vec![WorkerCapability::Search, WorkerCapability::Think],
        )
    }
}

/// 构造时校验过的子智能体集合（名称唯一且非空、提示非空、至少一种能力）
#[derive(Debug, Clone)]
pub struct WorkerRegistry {
    workers: Vec<WorkerSpec>,
}

impl WorkerRegistry {
    pub fn new(workers: Vec<WorkerSpec>) -> Result<Self, ConfigError> {
        if workers.is_empty() {
            return Err(ConfigError::InvalidWorker("no workers registered".to_string()));
        }
        let mut seen = HashSet::new();
        for w in &workers {
            if w.name.trim().is_empty() {
                return Err(ConfigError::InvalidWorker("worker name is empty".to_string()));
            }
            if !seen.insert(w.name.as_str()) {
                return Err(ConfigError::InvalidWorker(format!(
                    "duplicate worker name '{}'",
                    w.name
                )));
            }
            if w.prompt.trim().is_empty() {
                return Err(ConfigError::InvalidWorker(format!(
                    "worker '{}' has an empty prompt",
                    w.name
                )));
            }
            if w.capabilities.is_empty() {
                return Err(ConfigError::InvalidWorker(format!(
                    "worker '{}' has no capabilities",
                    w.name
                )));
            }
        }
        Ok(Self { workers })
    }

    pub fn get(&self, name: &str) -> Option<&WorkerSpec> {
        self.workers.iter().find(|w| w.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.name.clone()).collect()
    }

    /// 供提示词使用的列表："- name: description (tools: ...)"
    pub fn describe(&self) -> String {
        self.workers
            .iter()
            .map(|w| {
                let tools: Vec<&str> = w
                    .capabilities
                    .iter()
                    .flat_map(|c| c.tool_names().iter().copied())
                    .collect();
                format!("- {}: {} (tools: {})", w.name, w.description, tools.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self {
            workers: vec![WorkerSpec::research_agent()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> WorkerSpec {
        WorkerSpec::new(name, "d", "p", vec![WorkerCapability::Think])
    }

    #[test]
    fn test_default_has_research_agent() {
        let reg = WorkerRegistry::default();
        let w = reg.get("research-agent").unwrap();
        assert!(w.capabilities.contains(&WorkerCapability::Search));
        assert!(!w.capabilities.contains(&WorkerCapability::Files));
        assert!(reg.describe().starts_with("- research-agent:"));
        assert!(reg.describe().ends_with("(tools: search, think)"));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = WorkerRegistry::new(vec![spec("a"), spec("a")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorker(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_invalid_specs_rejected() {
        assert!(WorkerRegistry::new(vec![]).is_err());
        assert!(WorkerRegistry::new(vec![spec(" ")]).is_err());
        assert!(WorkerRegistry::new(vec![WorkerSpec::new("a", "d", "", vec![WorkerCapability::Think])]).is_err());
        assert!(WorkerRegistry::new(vec![WorkerSpec::new("a", "d", "p", vec![])]).is_err());
        assert!(WorkerRegistry::new(vec![spec("a"), spec("b")]).is_ok());
    }

    #[test]
    fn test_capability_tools() {
        assert_eq!(WorkerCapability::Files.tool_names(), &["ls", "read_file", "write_file"]);
        assert_eq!(WorkerCapability::Todos.to_string(), "todos");
    }
}
