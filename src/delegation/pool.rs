//! 子智能体并发池
//!
//! 公平（FIFO）的 tokio Semaphore 限制同时运行的子智能体数量；
//! 许可随 PoolPermit 移入子任务，任务结束时释放。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::core::AgentError;

/// 并发池
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    limit: usize,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// 运行许可；Drop 时归还并更新 active 计数
#[derive(Debug)]
pub struct PoolPermit {
    _permit: OwnedSemaphorePermit,
    active: Arc<AtomicUsize>,
}

impl Drop for PoolPermit {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerPool {
    /// 上限按 `max(1)` 截断；从配置构造时传入的已是校验过的 >= 1 值
    pub fn new(max_concurrent: usize) -> Self {
        let limit = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// 按提交顺序等待许可
    pub async fn acquire(&self) -> Result<PoolPermit, AgentError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AgentError::ToolExecutionFailed("worker pool closed".to_string()))?;
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Ok(PoolPermit {
            _permit: permit,
            active: self.active.clone(),
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 当前运行中的子智能体数
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// 历史最高并发数
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_CONCURRENT_UNITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_permits_bound_and_release() {
        let pool = WorkerPool::new(2);
        let a = pool.acquire().await.unwrap();
        let _b = pool.acquire().await.unwrap();
        assert_eq!(pool.active(), 2);
        assert!(tokio::time::timeout(Duration::from_millis(20), pool.acquire())
            .await
            .is_err());
        drop(a);
        assert_eq!(pool.active(), 1);
        let _c = pool.acquire().await.unwrap();
        assert_eq!(pool.peak(), 2);
    }

    #[tokio::test]
    async fn test_waiters_admitted_in_order() {
        let pool = WorkerPool::new(1);
        let first = pool.acquire().await.unwrap();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for i in 0..3 {
            let pool = pool.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _p = pool.acquire().await.unwrap();
                order.lock().unwrap().push(i);
            }));
            // 确保 waiter 依次入队
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        drop(first);
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_zero_limit_clamped() {
        assert_eq!(WorkerPool::new(0).limit(), 1);
    }
}
