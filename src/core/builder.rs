//! Orchestrator 构建器：显式工厂，替代模块级全局 Agent
//!
//! 每个依赖都可注入（测试用脚本 LLM、固定搜索后端等）；未注入时按有效配置创建。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::config::EffectiveConfig;
use crate::core::orchestrator::{create_llm_from_config, create_summarizer_from_config, Orchestrator};
use crate::core::AgentError;
use crate::delegation::{WorkerRegistry, WorkerSpec};
use crate::llm::LlmClient;
use crate::react::{EventSink, RunEvent};
use crate::tools::{SearchBackend, WebFetchBackend, DEFAULT_TOOL_TIMEOUT_SECS};

/// Orchestrator 构建器
pub struct OrchestratorBuilder {
    config: EffectiveConfig,
    llm: Option<Arc<dyn LlmClient>>,
    summarizer: Option<Arc<dyn LlmClient>>,
    search: Option<Arc<dyn SearchBackend>>,
    workers: Option<Vec<WorkerSpec>>,
    events: Option<UnboundedSender<RunEvent>>,
    tool_timeout_secs: u64,
}

impl OrchestratorBuilder {
    pub fn new(config: EffectiveConfig) -> Self {
        Self {
            config,
            llm: None,
            summarizer: None,
            search: None,
            workers: None,
            events: None,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }

    /// 协调者与子智能体共用的推理模型
    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// search 工具用于摘要的模型
    pub fn with_summarizer(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.summarizer = Some(llm);
        self
    }

    pub fn with_search_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.search = Some(backend);
        self
    }

    /// 替换默认的 research-agent 列表
    pub fn with_workers(mut self, workers: Vec<WorkerSpec>) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_event_sender(mut self, tx: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_tool_timeout(mut self, secs: u64) -> Self {
        self.tool_timeout_secs = secs;
        self
    }

    /// 校验子智能体定义并补齐未注入的依赖
    pub fn build(self) -> Result<Orchestrator, AgentError> {
        let workers = match self.workers {
            Some(specs) => WorkerRegistry::new(specs)?,
            None => WorkerRegistry::default(),
        };
        let llm = match self.llm {
            Some(llm) => llm,
            None => create_llm_from_config(&self.config)?,
        };
        // 摘要模型缺凭据时退化为截断预览
        let summarizer = match self.summarizer {
            Some(s) => Some(s),
            None => create_summarizer_from_config(&self.config).ok(),
        };
        let search = self
            .search
            .unwrap_or_else(|| Arc::new(WebFetchBackend::with_default_domains()));

        tracing::info!(
            model = %self.config.model(),
            workers = ?workers.names(),
            max_concurrent_units = self.config.max_concurrent_units(),
            max_iterations = self.config.max_iterations(),
            recursion_limit = self.config.recursion_limit(),
            "orchestrator built"
        );

        Ok(Orchestrator {
            config: self.config,
            llm,
            summarizer,
            search,
            workers,
            events: EventSink::new(self.events),
            tool_timeout_secs: self.tool_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ConfigError, ConfigOverrides, EnvSnapshot, RunnableConfig};
    use crate::delegation::WorkerCapability;
    use crate::llm::MockLlmClient;

    fn config_without_key() -> EffectiveConfig {
        resolve(
            &ConfigOverrides::default(),
            &RunnableConfig::new(),
            &EnvSnapshot::from_pairs(Vec::<(String, String)>::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_build_without_key_fails() {
        let err = OrchestratorBuilder::new(config_without_key()).build().err().unwrap();
        assert!(matches!(err, AgentError::ConfigError(ConfigError::Missing("api_key"))));
    }

    #[test]
    fn test_build_with_injected_llm() {
        let orch = OrchestratorBuilder::new(config_without_key())
            .with_llm(Arc::new(MockLlmClient))
            .build()
            .unwrap();
        assert_eq!(orch.workers().names(), vec!["research-agent"]);
    }

    #[test]
    fn test_invalid_workers_rejected() {
        let dup = WorkerSpec::new("a", "d", "p", vec![WorkerCapability::Think]);
        let err = OrchestratorBuilder::new(config_without_key())
            .with_llm(Arc::new(MockLlmClient))
            .with_workers(vec![dup.clone(), dup])
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, AgentError::ConfigError(ConfigError::InvalidWorker(_))));
    }
}
