//! 虚拟工作区：按路径寻址的内存文件表
//!
//! 用于把大段内容（抓取的网页、草稿）移出对话历史。写入即整体覆盖，不做版本；
//! list 按首次写入顺序返回，覆盖写不改变位置。

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

/// 单次运行内的文件表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualFs {
    order: Vec<String>,
    files: HashMap<String, String>,
}

impl VirtualFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn write(&mut self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        if !self.files.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.files.insert(path, content.into());
    }

    pub fn list(&self) -> Vec<String> {
        self.order.clone()
    }

    /// 按插入顺序导出 (path, content)
    pub fn entries(&self) -> Vec<FileEntry> {
        self.order
            .iter()
            .filter_map(|p| {
                self.files.get(p).map(|c| FileEntry {
                    path: p.clone(),
                    content: c.clone(),
                })
            })
            .collect()
    }
}

/// 运行结束时导出的文件快照条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

/// 工作区句柄：协调者与被授权的工具共享同一张文件表
///
/// 并发写同一路径时按加锁顺序后写覆盖先写。
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    inner: Arc<RwLock<VirtualFs>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self, path: &str) -> Option<String> {
        self.inner.read().await.read(path).map(str::to_string)
    }

    pub async fn write(&self, path: impl Into<String>, content: impl Into<String>) {
        let path = path.into();
        let content = content.into();
        tracing::debug!(path = %path, bytes = content.len(), "workspace write");
        self.inner.write().await.write(path, content);
    }

    pub async fn list(&self) -> Vec<String> {
        self.inner.read().await.list()
    }

    pub async fn snapshot(&self) -> Vec<FileEntry> {
        self.inner.read().await.entries()
    }
}
