//! 编排器：一次运行 = 新的共享状态 + 协调者循环
//!
//! 每次 run 都新建 SharedState、委派引擎与工具注册表，运行之间不共享任何可变状态。

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::config::{resolve, ConfigError, ConfigOverrides, EffectiveConfig, EnvSnapshot, RunnableConfig};
use crate::core::{AgentError, OrchestratorBuilder, RecoveryEngine};
use crate::delegation::{Delegator, WorkerPool, WorkerRegistry, WorkerToolbox};
use crate::llm::{LlmClient, OpenAiClient};
use crate::memory::{FileEntry, Message, SharedState, Todo};
use crate::prompts::coordinator_prompt;
use crate::react::{run_coordinator, CoordinatorSession, EventSink, Planner};
use crate::tools::{
    LsTool, ReadFileTool, ReadTodosTool, SearchBackend, SearchTool, TaskTool, ThinkTool,
    ToolExecutor, ToolRegistry, WriteFileTool, WriteTodosTool,
};

/// 根据有效配置创建推理模型客户端（provider:model，缺凭据即报错）
pub fn create_llm_from_config(cfg: &EffectiveConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let key = cfg.api_key().ok_or(ConfigError::Missing("api_key"))?;
    Ok(Arc::new(OpenAiClient::for_model(cfg.model(), key, cfg.temperature())))
}

/// 摘要模型客户端：温度固定为 0
pub fn create_summarizer_from_config(
    cfg: &EffectiveConfig,
) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let key = cfg.api_key().ok_or(ConfigError::Missing("api_key"))?;
    Ok(Arc::new(OpenAiClient::for_model(cfg.summarization_model(), key, 0.0)))
}

/// 一次运行的结果
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub answer: String,
    pub todos: Vec<Todo>,
    pub files: Vec<FileEntry>,
    pub history: Vec<Message>,
    pub turns: usize,
    /// 本次运行中子智能体的最高并发数
    pub peak_concurrency: usize,
}

/// 编排器：由 OrchestratorBuilder 构建，可多次 run
pub struct Orchestrator {
    pub(crate) config: EffectiveConfig,
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) summarizer: Option<Arc<dyn LlmClient>>,
    pub(crate) search: Arc<dyn SearchBackend>,
    pub(crate) workers: WorkerRegistry,
    pub(crate) events: EventSink,
    pub(crate) tool_timeout_secs: u64,
}

impl Orchestrator {
    pub fn builder(config: EffectiveConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    pub fn workers(&self) -> &WorkerRegistry {
        &self.workers
    }

    /// 协调者工具：文件、清单、think、search 与 task
    fn coordinator_tools(&self, toolbox: &WorkerToolbox, delegator: Arc<Delegator>) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(LsTool::new(toolbox.files.clone()));
        tools.register(ReadFileTool::new(toolbox.files.clone()));
        tools.register(WriteFileTool::new(toolbox.files.clone()));
        tools.register(WriteTodosTool::new(toolbox.todos.clone()));
        tools.register(ReadTodosTool::new(toolbox.todos.clone()));
        tools.register(ThinkTool);
        let mut search = SearchTool::new(toolbox.search.clone(), toolbox.files.clone());
        if let Some(s) = &toolbox.summarizer {
            search = search.with_summarizer(s.clone());
        }
        tools.register(search);
        tools.register(TaskTool::new(delegator));
        tools
    }

    /// 执行一个顶层任务
    pub async fn run(&self, task: &str) -> Result<RunOutcome, AgentError> {
        let run_id = Uuid::new_v4().to_string();
        tracing::info!(run_id = %run_id, task = %task, "run started");

        let mut state = SharedState::new();
        let toolbox = WorkerToolbox {
            files: state.files.clone(),
            todos: state.todos.clone(),
            search: self.search.clone(),
            summarizer: self.summarizer.clone(),
        };
        let delegator = Arc::new(
            Delegator::new(
                self.workers.clone(),
                WorkerPool::new(self.config.max_concurrent_units()),
                self.llm.clone(),
                toolbox.clone(),
                self.config.max_iterations(),
            )
            .with_events(self.events.clone())
            .with_tool_timeout(self.tool_timeout_secs),
        );
        let tools = self.coordinator_tools(&toolbox, delegator.clone());

        state.push(Message::system(coordinator_prompt(
            &tools.to_schema_json(),
            &self.workers.describe(),
            self.config.max_concurrent_units(),
            self.config.max_iterations(),
        )));
        state.push(Message::user(task));

        let executor = ToolExecutor::new(tools, self.tool_timeout_secs);
        let planner = Planner::new(self.llm.clone());
        let recovery = RecoveryEngine::new();
        let session = CoordinatorSession {
            planner: &planner,
            executor: &executor,
            recovery: &recovery,
            recursion_limit: self.config.recursion_limit(),
            events: &self.events,
        };

        let result = match run_coordinator(&session, &mut state).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "run failed");
                return Err(e);
            }
        };
        let (prompt_tokens, completion_tokens, _) = planner.token_usage();
        tracing::info!(
            run_id = %run_id,
            turns = result.turns,
            peak_concurrency = delegator.pool().peak(),
            prompt_tokens,
            completion_tokens,
            "run finished"
        );

        Ok(RunOutcome {
            run_id,
            answer: result.answer,
            todos: state.todos.get().await,
            files: state.files.snapshot().await,
            history: state.history,
            turns: result.turns,
            peak_concurrency: delegator.pool().peak(),
        })
    }
}

/// 顶层入口：用进程环境解析配置后执行一次
pub async fn run(
    task: &str,
    overrides: &ConfigOverrides,
    runnable: &RunnableConfig,
) -> Result<RunOutcome, AgentError> {
    let config = resolve(overrides, runnable, &EnvSnapshot::from_process())?;
    OrchestratorBuilder::new(config).build()?.run(task).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: Option<&str>, model: &str) -> EffectiveConfig {
        let overrides = ConfigOverrides {
            model: Some(model.to_string()),
            api_key: key.map(str::to_string),
            ..Default::default()
        };
        resolve(&overrides, &RunnableConfig::new(), &EnvSnapshot::from_pairs(Vec::<(String, String)>::new())).unwrap()
    }

    #[test]
    fn test_llm_requires_api_key() {
        let err = create_llm_from_config(&config(None, "gpt-4o")).err().unwrap();
        assert!(matches!(err, ConfigError::Missing("api_key")));
        assert!(create_llm_from_config(&config(Some("sk-test"), "deepseek:deepseek-chat")).is_ok());
        assert!(create_summarizer_from_config(&config(Some("sk-test"), "gpt-4o")).is_ok());
    }
}
