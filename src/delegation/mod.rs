//! 委派子系统：子智能体注册表、并发池、子智能体循环与委派引擎

pub mod engine;
pub mod pool;
pub mod registry;
pub mod worker;

pub use engine::{DelegationResult, Delegator, WorkerToolbox};
pub use pool::{PoolPermit, WorkerPool};
pub use registry::{WorkerCapability, WorkerRegistry, WorkerSpec};
pub use worker::{run_worker, DelegationOutcome, WorkerContext, WorkerRun};
