//! 协调者主循环
//!
//! Plan -> 执行本回合全部 Tool Call（并发，按发出顺序写回）-> 下一轮 Plan；
//! 直到模型给出最终回答或回合数达到 recursion_limit。

use futures_util::future::join_all;

use crate::core::{AgentError, RecoveryAction, RecoveryEngine};
use crate::memory::{Message, SharedState, ToolCall};
use crate::react::{parse_llm_output, preview, EventSink, Planner, PlannerOutput, RunEvent};
use crate::tools::ToolExecutor;

/// 协调者一次运行所需的组件
pub struct CoordinatorSession<'a> {
    pub planner: &'a Planner,
    pub executor: &'a ToolExecutor,
    pub recovery: &'a RecoveryEngine,
    pub recursion_limit: usize,
    pub events: &'a EventSink,
}

/// 协调者循环结果
#[derive(Debug, Clone)]
pub struct CoordinatorResult {
    pub answer: String,
    pub turns: usize,
}

/// 并发执行一个回合内的所有调用；返回的 Tool 消息与 calls 顺序一致。
/// 工具失败不会中断回合，而是转成 "Error: ..." 结果交给模型。
pub async fn execute_calls(
    executor: &ToolExecutor,
    recovery: &RecoveryEngine,
    events: &EventSink,
    calls: &[ToolCall],
) -> Vec<Message> {
    let futures = calls.iter().map(|call| async move {
        events.emit(RunEvent::ToolCall {
            tool: call.tool.clone(),
            args: call.args.clone(),
        });
        let observation = match executor.execute(&call.tool, call.args.clone()).await {
            Ok(out) => out,
            Err(e) => {
                events.emit(RunEvent::ToolFailure {
                    tool: call.tool.clone(),
                    reason: e.to_string(),
                });
                match recovery.handle(&e) {
                    RecoveryAction::ReportToModel(msg) | RecoveryAction::RetryWithPrompt(msg) => msg,
                    RecoveryAction::Abort => format!("Error: {e}"),
                }
            }
        };
        events.emit(RunEvent::Observation {
            tool: call.tool.clone(),
            preview: preview(&observation),
        });
        Message::tool(call.tool.clone(), observation)
    });
    join_all(futures).await
}

/// 模型回复无法解析时的处理：RetryWithPrompt 时返回需要追加的消息，否则返回错误
pub fn recover_from_parse_error(
    recovery: &RecoveryEngine,
    events: &EventSink,
    err: AgentError,
    raw: &str,
) -> Result<Vec<Message>, AgentError> {
    match recovery.handle(&err) {
        RecoveryAction::RetryWithPrompt(prompt) => {
            events.emit(RunEvent::Recovery {
                action: "RetryWithPrompt".to_string(),
                detail: prompt.clone(),
            });
            Ok(vec![Message::assistant(raw), Message::user(prompt)])
        }
        _ => Err(err),
    }
}

/// 执行协调者循环；state.history 需已包含 system 与用户任务
pub async fn run_coordinator(
    session: &CoordinatorSession<'_>,
    state: &mut SharedState,
) -> Result<CoordinatorResult, AgentError> {
    let limit = session.recursion_limit;
    let events = session.events;

    for turn in 1..=limit {
        events.emit(RunEvent::TurnStarted { turn, limit });

        let raw = match session.planner.plan(&state.history).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(turn, error = %e, "coordinator LLM call failed");
                events.emit(RunEvent::Error { text: e.to_string() });
                return Err(e);
            }
        };

        match parse_llm_output(&raw) {
            Ok(PlannerOutput::Response(answer)) => {
                tracing::info!(turn, "coordinator produced final answer");
                state.push(Message::assistant(answer.clone()));
                events.emit(RunEvent::FinalAnswer {
                    text: answer.clone(),
                });
                return Ok(CoordinatorResult {
                    answer,
                    turns: turn,
                });
            }
            Ok(PlannerOutput::ToolCalls(calls)) => {
                tracing::info!(turn, calls = calls.len(), "coordinator turn");
                state.push(Message::assistant_tool_calls(raw, calls.clone()));
                let results =
                    execute_calls(session.executor, session.recovery, events, &calls).await;
                for msg in results {
                    state.push(msg);
                }
            }
            Err(e) => {
                tracing::warn!(turn, error = %e, "unparseable coordinator reply");
                for msg in recover_from_parse_error(session.recovery, events, e, &raw)? {
                    state.push(msg);
                }
            }
        }
    }

    events.emit(RunEvent::Error {
        text: format!("no final answer after {limit} turns"),
    });
    Err(AgentError::DidNotConverge { turns: limit })
}
