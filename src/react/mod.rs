//! 推理循环：Planner、协调者主循环与过程事件

pub mod events;
pub mod loop_;
pub mod planner;

pub use events::{preview, EventSink, RunEvent};
pub use loop_::{
    execute_calls, recover_from_parse_error, run_coordinator, CoordinatorResult,
    CoordinatorSession,
};
pub use planner::{parse_llm_output, Planner, PlannerOutput};
