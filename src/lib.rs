//! Hive - 协调者 / 子智能体委派运行时
//!
//! 模块划分：
//! - **config**: 四来源逐字段合并的配置解析（覆盖 > 运行参数表 > 环境变量 > 默认值）
//! - **core**: 错误与恢复、Orchestrator 构建器与一次运行的主控
//! - **delegation**: 子智能体注册表、并发池、子智能体循环与委派引擎
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 对话历史、任务清单与虚拟工作区
//! - **observability**: tracing 初始化
//! - **prompts**: 协调者与子智能体提示词
//! - **react**: Planner、协调者主循环与过程事件
//! - **tools**: 工具箱（ls、read_file、write_file、write_todos、read_todos、think、search、task）与执行器

pub mod config;
pub mod core;
pub mod delegation;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod prompts;
pub mod react;
pub mod tools;

pub use crate::config::{resolve, ConfigOverrides, EffectiveConfig, EnvSnapshot, RunnableConfig};
pub use crate::core::{run, AgentError, Orchestrator, OrchestratorBuilder, RunOutcome};
