//! Search 工具：查询 SearchBackend，原始结果写入工作区，摘要返回给模型
//!
//! 具体的搜索服务通过 SearchBackend 注入；内置的 WebFetchBackend 把查询视为 URL，
//! 只抓取白名单域名，带超时与大小上限，HTML 用 html2text 提取可读文本。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use html2text::from_read;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::llm::LlmClient;
use crate::memory::{Message, Workspace};
use crate::tools::Tool;

/// 摘要失败时的预览长度（字符）
const PREVIEW_CHARS: usize = 500;
/// 未指定 max_results 时保留的结果条数
const DEFAULT_MAX_RESULTS: usize = 3;

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// 搜索后端：给定查询返回若干结果
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, String>;
}

/// 去除 HTML 标签（html2text 失败时的回退）
fn strip_html_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("<!")
        || s.to_ascii_lowercase().starts_with("<html")
        || (s.contains("</") && (s.contains("<head") || s.contains("<body") || s.contains("<title")))
}

/// 从 URL 中取 host（小写，去端口）
pub fn extract_domain(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split('/').next()?.split(':').next()?;
    if host.is_empty() {
        None
    } else {
        Some(host.to_lowercase())
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect::<String>() + "\n...[truncated]"
    } else {
        s.to_string()
    }
}

/// 抓取单个 URL 的后端（查询即 URL）
pub struct WebFetchBackend {
    client: Client,
    allowed_domains: HashSet<String>,
    max_result_chars: usize,
}

impl WebFetchBackend {
    pub fn new(allowed_domains: Vec<String>, timeout_secs: u64, max_result_chars: usize) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en;q=0.9,zh-CN;q=0.8"));
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("hive/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .unwrap_or_default();
        Self {
            client,
            allowed_domains: allowed_domains.into_iter().map(|d| d.to_lowercase()).collect(),
            max_result_chars,
        }
    }

    /// 常用文档站点白名单
    pub fn with_default_domains() -> Self {
        let domains = [
            "en.wikipedia.org",
            "docs.rs",
            "doc.rust-lang.org",
            "developer.mozilla.org",
            "github.com",
            "arxiv.org",
            "stackoverflow.com",
        ];
        Self::new(domains.iter().map(|d| d.to_string()).collect(), 15, 20_000)
    }

    pub fn is_allowed(&self, url: &str) -> Result<(), String> {
        let domain = extract_domain(url).ok_or_else(|| "Invalid or missing URL".to_string())?;
        if self.allowed_domains.contains(&domain) {
            Ok(())
        } else {
            Err(format!("Domain not in allowlist: {domain}"))
        }
    }

    fn html_to_text(html: &str) -> String {
        match from_read(html.as_bytes(), 120) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => strip_html_tags(html),
        }
    }
}

#[async_trait]
impl SearchBackend for WebFetchBackend {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>, String> {
        let url = query.trim();
        self.is_allowed(url)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body = resp.text().await.map_err(|e| format!("Read body: {e}"))?;
        let body = body.trim_start_matches('\u{FEFF}');
        let text = if looks_like_html(body) {
            Self::html_to_text(body)
        } else {
            body.to_string()
        };
        Ok(vec![SearchHit {
            title: url.to_string(),
            url: url.to_string(),
            content: truncate_chars(&text, self.max_result_chars),
        }])
    }
}

/// 由标题生成工作区文件名：小写字母数字，其余替换为 '_'，追加短 id 防止覆盖
fn file_name_for(title: &str) -> String {
    let stem: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .take(6)
        .collect::<Vec<_>>()
        .join("_");
    let id = uuid::Uuid::new_v4().simple().to_string();
    let stem = if stem.is_empty() { "result".to_string() } else { stem };
    format!("search_{stem}_{}.md", &id[..8])
}

/// Search 工具
pub struct SearchTool {
    backend: Arc<dyn SearchBackend>,
    workspace: Workspace,
    summarizer: Option<Arc<dyn LlmClient>>,
}

impl SearchTool {
    pub fn new(backend: Arc<dyn SearchBackend>, workspace: Workspace) -> Self {
        Self {
            backend,
            workspace,
            summarizer: None,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn LlmClient>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    async fn summarize(&self, hit: &SearchHit) -> String {
        let Some(llm) = &self.summarizer else {
            return truncate_chars(&hit.content, PREVIEW_CHARS);
        };
        let prompt = crate::prompts::summarize_prompt(&hit.content);
        match llm.complete(&[Message::user(prompt)]).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => truncate_chars(&hit.content, PREVIEW_CHARS),
            Err(e) => {
                tracing::warn!(url = %hit.url, error = %e, "summarization failed, using preview");
                truncate_chars(&hit.content, PREVIEW_CHARS)
            }
        }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search for information. Raw results are saved to the workspace and a summary is returned. \
         Args: {\"query\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "max_results": {"type": "integer", "minimum": 1}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, String> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim();
        if query.is_empty() {
            return Err("missing required argument 'query'".to_string());
        }
        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .map(|n| (n as usize).max(1))
            .unwrap_or(DEFAULT_MAX_RESULTS);
        tracing::info!(query = %query, max_results, "search tool execute");

        let hits = self.backend.search(query, max_results).await?;
        if hits.is_empty() {
            return Ok(format!("No results found for '{query}'"));
        }

        let mut sections = Vec::with_capacity(hits.len());
        for hit in hits.iter().take(max_results) {
            let file = file_name_for(&hit.title);
            let raw = format!("# {}\n\nURL: {}\n\n{}", hit.title, hit.url, hit.content);
            self.workspace.write(&file, &raw).await;
            let summary = self.summarize(hit).await;
            sections.push(format!(
                "## {}\n**URL:** {}\n**File:** {}\n\n{}",
                hit.title, hit.url, file, summary
            ));
        }
        Ok(format!(
            "Found {} result(s) for '{}':\n\n{}",
            sections.len(),
            query,
            sections.join("\n\n---\n\n")
        ))
    }
}
