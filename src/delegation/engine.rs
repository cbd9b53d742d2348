//! 委派引擎：查找子智能体 -> 等待并发许可 -> 在独立任务中运行 -> 收集单一结果
//!
//! 子智能体的崩溃与 LLM 错误都收敛为 DelegationOutcome::Failed，不会传给协调者。

use std::sync::Arc;

use uuid::Uuid;

use crate::core::AgentError;
use crate::delegation::{
    run_worker, DelegationOutcome, WorkerCapability, WorkerContext, WorkerPool, WorkerRegistry,
    WorkerRun, WorkerSpec,
};
use crate::llm::LlmClient;
use crate::memory::{TodoBoard, Workspace};
use crate::react::{EventSink, Planner, RunEvent};
use crate::tools::{
    LsTool, ReadFileTool, ReadTodosTool, SearchBackend, SearchTool, ThinkTool, ToolExecutor,
    ToolRegistry, WriteFileTool, WriteTodosTool, DEFAULT_TOOL_TIMEOUT_SECS,
};

/// 子智能体可用的资源：父级工作区与清单句柄、搜索后端、摘要模型
#[derive(Clone)]
pub struct WorkerToolbox {
    pub files: Workspace,
    pub todos: TodoBoard,
    pub search: Arc<dyn SearchBackend>,
    pub summarizer: Option<Arc<dyn LlmClient>>,
}

impl WorkerToolbox {
    /// 只注册该 worker 被授予能力对应的工具
    pub fn registry_for(&self, spec: &WorkerSpec) -> ToolRegistry {
        let mut reg = ToolRegistry::new();
        for cap in &spec.capabilities {
            match cap {
                WorkerCapability::Search => {
                    let mut tool = SearchTool::new(self.search.clone(), self.files.clone());
                    if let Some(s) = &self.summarizer {
                        tool = tool.with_summarizer(s.clone());
                    }
                    reg.register(tool);
                }
                WorkerCapability::Think => reg.register(ThinkTool),
                WorkerCapability::Files => {
                    reg.register(LsTool::new(self.files.clone()));
                    reg.register(ReadFileTool::new(self.files.clone()));
                    reg.register(WriteFileTool::new(self.files.clone()));
                }
                WorkerCapability::Todos => {
                    reg.register(WriteTodosTool::new(self.todos.clone()));
                    reg.register(ReadTodosTool::new(self.todos.clone()));
                }
            }
        }
        tracing::debug!(worker = %spec.name, tools = ?reg.tool_names(), "worker toolbox");
        reg
    }
}

/// 一次委派的结果
#[derive(Debug, Clone)]
pub struct DelegationResult {
    pub id: String,
    pub worker: String,
    pub content: String,
    pub outcome: DelegationOutcome,
    pub iterations: usize,
}

/// 委派引擎
pub struct Delegator {
    registry: WorkerRegistry,
    pool: WorkerPool,
    llm: Arc<dyn LlmClient>,
    toolbox: WorkerToolbox,
    max_iterations: usize,
    tool_timeout_secs: u64,
    events: EventSink,
}

impl Delegator {
    /// `max_iterations` 按 `max(1)` 截断，保证每个子智能体至少调用一次模型；
    /// Orchestrator 传入的是 resolve 校验过的值
    pub fn new(
        registry: WorkerRegistry,
        pool: WorkerPool,
        llm: Arc<dyn LlmClient>,
        toolbox: WorkerToolbox,
        max_iterations: usize,
    ) -> Self {
        Self {
            registry,
            pool,
            llm,
            toolbox,
            max_iterations: max_iterations.max(1),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            events: EventSink::default(),
        }
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn with_tool_timeout(mut self, secs: u64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }

    pub fn registry(&self) -> &WorkerRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// 把任务交给指定子智能体；未知名称返回 UnknownWorker，其余失败都体现在结果里
    pub async fn delegate(
        &self,
        task_description: &str,
        worker_name: &str,
    ) -> Result<DelegationResult, AgentError> {
        let spec = self
            .registry
            .get(worker_name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownWorker(worker_name.to_string()))?;
        let id = Uuid::new_v4().to_string();
        self.events.emit(RunEvent::DelegationStarted {
            id: id.clone(),
            worker: spec.name.clone(),
            description: task_description.to_string(),
        });

        let permit = self.pool.acquire().await?;
        tracing::info!(id = %id, worker = %spec.name, active = self.pool.active(), "delegation admitted");

        let registry = self.toolbox.registry_for(&spec);
        let ctx = WorkerContext::new(
            &spec,
            task_description,
            &registry.to_schema_json(),
            self.toolbox.todos.clone(),
            self.toolbox.files.clone(),
        );
        let executor = ToolExecutor::new(registry, self.tool_timeout_secs);
        let planner = Planner::new(self.llm.clone());
        let events = self.events.clone();
        let max_iterations = self.max_iterations;

        let handle = tokio::spawn(async move {
            let _permit = permit;
            run_worker(ctx, &planner, &executor, max_iterations, &events).await
        });
        let run = match handle.await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!(id = %id, worker = %spec.name, error = %e, "worker task aborted");
                WorkerRun {
                    content: format!("Worker '{}' failed: task aborted ({e})", spec.name),
                    outcome: DelegationOutcome::Failed,
                    iterations: 0,
                }
            }
        };

        self.events.emit(RunEvent::DelegationFinished {
            id: id.clone(),
            worker: spec.name.clone(),
            outcome: run.outcome.to_string(),
            iterations: run.iterations,
        });
        tracing::info!(id = %id, worker = %spec.name, outcome = %run.outcome, "delegation finished");

        Ok(DelegationResult {
            id,
            worker: spec.name,
            content: run.content,
            outcome: run.outcome,
            iterations: run.iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;
    use crate::tools::SearchHit;
    use async_trait::async_trait;

    struct NoSearch;

    #[async_trait]
    impl SearchBackend for NoSearch {
        async fn search(&self, _q: &str, _n: usize) -> Result<Vec<SearchHit>, String> {
            Ok(vec![])
        }
    }

    fn toolbox() -> WorkerToolbox {
        WorkerToolbox {
            files: Workspace::new(),
            todos: TodoBoard::new(),
            search: Arc::new(NoSearch),
            summarizer: None,
        }
    }

    #[test]
    fn test_registry_follows_capabilities() {
        let spec = WorkerSpec::new(
            "w",
            "d",
            "p",
            vec![WorkerCapability::Think, WorkerCapability::Files],
        );
        let names = toolbox().registry_for(&spec).tool_names();
        assert_eq!(names, vec!["think", "ls", "read_file", "write_file"]);
        let research = toolbox().registry_for(&WorkerSpec::research_agent()).tool_names();
        assert_eq!(research, vec!["search", "think"]);
    }

    #[tokio::test]
    async fn test_unknown_worker() {
        let d = Delegator::new(
            WorkerRegistry::default(),
            WorkerPool::new(1),
            Arc::new(ScriptedLlmClient::new(["x"])),
            toolbox(),
            3,
        );
        let err = d.delegate("t", "ghost").await.unwrap_err();
        assert!(matches!(err, AgentError::UnknownWorker(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_delegate_completes_and_releases_permit() {
        let d = Delegator::new(
            WorkerRegistry::default(),
            WorkerPool::new(1),
            Arc::new(ScriptedLlmClient::new(["found it"])),
            toolbox(),
            3,
        );
        let res = d.delegate("look up X", "research-agent").await.unwrap();
        assert_eq!(res.outcome, DelegationOutcome::Completed);
        assert_eq!(res.content, "found it");
        assert_eq!(res.worker, "research-agent");
        assert_eq!(d.pool().active(), 0);
        assert_eq!(d.pool().peak(), 1);
    }

    #[tokio::test]
    async fn test_zero_iterations_clamped_to_one() {
        let d = Delegator::new(
            WorkerRegistry::default(),
            WorkerPool::new(0),
            Arc::new(ScriptedLlmClient::new([r#"{"tool": "think", "args": {"reflection": "x"}}"#])),
            toolbox(),
            0,
        );
        assert_eq!(d.pool().limit(), 1);
        let res = d.delegate("look up X", "research-agent").await.unwrap();
        assert_eq!(res.outcome, DelegationOutcome::Exhausted { iterations: 1 });
        assert_eq!(res.iterations, 1);
    }
}
