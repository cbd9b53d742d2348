//! 子智能体循环
//!
//! 子智能体只看到种子提示与任务描述；每次推理计一次迭代，达到上限时
//! 用最近的推理与观察拼出部分结果，而不是报错。

use std::fmt;

use serde::Serialize;

use crate::core::RecoveryEngine;
use crate::delegation::WorkerSpec;
use crate::memory::{Message, Role, SharedState, TodoBoard, Workspace};
use crate::react::{
    execute_calls, parse_llm_output, recover_from_parse_error, EventSink, Planner, PlannerOutput,
};
use crate::tools::ToolExecutor;

/// 部分结果中保留的最近观察条数
const PARTIAL_OBSERVATIONS: usize = 3;
/// 每条观察保留的字符数
const PARTIAL_OBSERVATION_CHARS: usize = 500;

/// 一次委派的结局
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DelegationOutcome {
    /// 子智能体给出了最终回答
    Completed,
    /// 达到迭代上限，结果为拼出的部分结论
    Exhausted { iterations: usize },
    /// LLM 错误或任务崩溃，结果为失败说明
    Failed,
}

impl fmt::Display for DelegationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegationOutcome::Completed => f.write_str("completed"),
            DelegationOutcome::Exhausted { iterations } => {
                write!(f, "exhausted after {iterations} iterations")
            }
            DelegationOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// 子智能体的一次执行结果
#[derive(Debug, Clone)]
pub struct WorkerRun {
    pub content: String,
    pub outcome: DelegationOutcome,
    pub iterations: usize,
}

/// 子智能体上下文：独立历史 + 迭代计数；todos / files 只能经授予的工具触达
#[derive(Debug)]
pub struct WorkerContext {
    pub worker: String,
    pub state: SharedState,
    pub iterations: usize,
}

impl WorkerContext {
    pub fn new(
        spec: &WorkerSpec,
        task_description: &str,
        tools_schema: &str,
        todos: TodoBoard,
        files: Workspace,
    ) -> Self {
        let history = vec![
            Message::system(crate::prompts::worker_prompt(&spec.prompt, tools_schema)),
            Message::user(task_description),
        ];
        Self {
            worker: spec.name.clone(),
            state: SharedState {
                history,
                todos,
                files,
            },
            iterations: 0,
        }
    }

    /// 迭代耗尽时的部分结果：最后一次推理 + 最近的工具观察
    pub fn synthesize_partial(&self) -> String {
        let last_reasoning = self
            .state
            .history
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.trim().to_string())
            .unwrap_or_default();
        let observations: Vec<String> = self
            .state
            .recent_tool_results(PARTIAL_OBSERVATIONS)
            .into_iter()
            .map(|m| {
                let text: String = m.content.chars().take(PARTIAL_OBSERVATION_CHARS).collect();
                format!("- {}: {}", m.name.as_deref().unwrap_or("tool"), text)
            })
            .collect();

        let mut out = format!(
            "[{}] stopped after {} iterations without a final answer. Partial findings:",
            self.worker, self.iterations
        );
        if !last_reasoning.is_empty() {
            out.push_str(&format!("\n\nLast reasoning:\n{last_reasoning}"));
        }
        if observations.is_empty() {
            out.push_str("\n\nNo tool observations were collected.");
        } else {
            out.push_str(&format!("\n\nRecent observations:\n{}", observations.join("\n")));
        }
        out
    }
}

/// 运行子智能体直到最终回答、迭代耗尽或 LLM 失败
pub async fn run_worker(
    mut ctx: WorkerContext,
    planner: &Planner,
    executor: &ToolExecutor,
    max_iterations: usize,
    events: &EventSink,
) -> WorkerRun {
    let recovery = RecoveryEngine::new();

    while ctx.iterations < max_iterations {
        ctx.iterations += 1;
        let raw = match planner.plan(&ctx.state.history).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(worker = %ctx.worker, iteration = ctx.iterations, error = %e, "worker LLM call failed");
                return WorkerRun {
                    content: format!("Worker '{}' failed: {}", ctx.worker, e),
                    outcome: DelegationOutcome::Failed,
                    iterations: ctx.iterations,
                };
            }
        };

        match parse_llm_output(&raw) {
            Ok(PlannerOutput::Response(answer)) => {
                tracing::info!(worker = %ctx.worker, iterations = ctx.iterations, "worker finished");
                return WorkerRun {
                    content: answer,
                    outcome: DelegationOutcome::Completed,
                    iterations: ctx.iterations,
                };
            }
            Ok(PlannerOutput::ToolCalls(calls)) => {
                ctx.state.push(Message::assistant_tool_calls(raw, calls.clone()));
                for msg in execute_calls(executor, &recovery, events, &calls).await {
                    ctx.state.push(msg);
                }
            }
            Err(e) => match recover_from_parse_error(&recovery, events, e, &raw) {
                Ok(msgs) => {
                    for msg in msgs {
                        ctx.state.push(msg);
                    }
                }
                Err(e) => {
                    return WorkerRun {
                        content: format!("Worker '{}' failed: {}", ctx.worker, e),
                        outcome: DelegationOutcome::Failed,
                        iterations: ctx.iterations,
                    }
                }
            },
        }
    }

    tracing::info!(worker = %ctx.worker, iterations = ctx.iterations, "worker hit iteration limit");
    WorkerRun {
        content: ctx.synthesize_partial(),
        outcome: DelegationOutcome::Exhausted {
            iterations: ctx.iterations,
        },
        iterations: ctx.iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::delegation::WorkerCapability;
    use crate::llm::{LlmError, ScriptedLlmClient};
    use crate::tools::{ThinkTool, ToolRegistry};

    fn ctx(task: &str) -> WorkerContext {
        let spec = WorkerSpec::new("w", "d", "seed", vec![WorkerCapability::Think]);
        WorkerContext::new(&spec, task, "[]", TodoBoard::new(), Workspace::new())
    }

    fn executor() -> ToolExecutor {
        let mut reg = ToolRegistry::new();
        reg.register(ThinkTool);
        ToolExecutor::new(reg, 5)
    }

    #[test]
    fn test_context_is_seeded_only_with_task() {
        let c = ctx("find X");
        assert_eq!(c.state.history.len(), 2);
        assert_eq!(c.state.history[0].role, Role::System);
        assert!(c.state.history[0].content.starts_with("seed"));
        assert_eq!(c.state.history[1], Message::user("find X"));
    }

    #[tokio::test]
    async fn test_worker_completes() {
        let llm = Arc::new(ScriptedLlmClient::new([
            r#"{"tool": "think", "args": {"reflection": "plan"}}"#,
            "X is 7",
        ]));
        let run = run_worker(ctx("find X"), &Planner::new(llm.clone()), &executor(), 3, &EventSink::default()).await;
        assert_eq!(run.outcome, DelegationOutcome::Completed);
        assert_eq!(run.content, "X is 7");
        assert_eq!(run.iterations, 2);
        // 第二次调用能看到第一次的工具结果
        let second = &llm.seen()[1];
        assert!(second.iter().any(|m| m.content.contains("Reflection recorded: plan")));
    }

    #[tokio::test]
    async fn test_worker_exhausts_with_partial() {
        let llm = Arc::new(
            ScriptedLlmClient::new(Vec::<String>::new())
                .with_fallback(r#"{"tool": "think", "args": {"reflection": "still digging"}}"#),
        );
        let run = run_worker(ctx("find X"), &Planner::new(llm.clone()), &executor(), 2, &EventSink::default()).await;
        assert_eq!(run.outcome, DelegationOutcome::Exhausted { iterations: 2 });
        assert_eq!(llm.calls(), 2);
        assert!(run.content.contains("stopped after 2 iterations"));
        assert!(run.content.contains("still digging"));
    }

    #[tokio::test]
    async fn test_worker_llm_error_degrades() {
        let llm = Arc::new(
            ScriptedLlmClient::new(Vec::<String>::new()).then_error(LlmError::ApiError("503".into())),
        );
        let run = run_worker(ctx("t"), &Planner::new(llm), &executor(), 3, &EventSink::default()).await;
        assert_eq!(run.outcome, DelegationOutcome::Failed);
        assert!(run.content.contains("failed"));
        assert!(run.content.contains("503"));
    }
}
