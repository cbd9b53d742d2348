//! 核心编排层：错误与恢复、Orchestrator 构建器与一次运行的主控

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod recovery;

pub use builder::OrchestratorBuilder;
pub use error::{AgentError, RecoveryAction};
pub use orchestrator::{
    create_llm_from_config, create_summarizer_from_config, run, Orchestrator, RunOutcome,
};
pub use recovery::RecoveryEngine;
