// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::page_snapshot::PageSnapshot;
use crate::domain::services::link_discoverer::LinkDiscoverer;
use crate::engines::traits::{FetchError, PageFetcher};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("layoutcrawl/", env!("CARGO_PKG_VERSION"));

/// HTTP抓取引擎
///
/// 基于reqwest实现，抓取HTML并提取外链。不执行JavaScript。
#[derive(Clone)]
pub struct ReqwestEngine {
    client: reqwest::Client,
}

impl ReqwestEngine {
    /// 创建新的抓取引擎
    ///
    /// # 参数
    ///
    /// * `user_agent` - 请求使用的 User-Agent
    /// * `timeout` - 单次请求的超时时间
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }

    /// 使用已有的客户端创建引擎
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl PageFetcher for ReqwestEngine {
    /// 执行HTTP抓取
    ///
    /// # 返回值
    ///
    /// * `Ok(PageSnapshot)` - 成功状态且内容为HTML
    /// * `Err(FetchError)` - 网络错误、超时、错误状态码或非HTML内容
    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        let start = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::network(format!("HTTP status {}", status)));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("text/html")
            .to_string();
        let final_url = response.url().to_string();

        let lowered = content_type.to_ascii_lowercase();
        if !lowered.contains("text/html") && !lowered.contains("application/xhtml+xml") {
            return Err(FetchError::parse_failure(format!(
                "unsupported content type `{}`",
                content_type
            )));
        }

        let content = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::timeout(e.to_string())
            } else {
                FetchError::parse_failure(format!("failed to read body: {}", e))
            }
        })?;

        let (content, links) = discover_links(content, final_url.clone()).await?;

        Ok(PageSnapshot {
            url: url.to_string(),
            final_url,
            status_code: status.as_u16(),
            content_type,
            content,
            links,
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "reqwest"
    }
}

/// 在阻塞线程池中解析HTML并提取链接，避免大页面占用异步工作线程
async fn discover_links(
    content: String,
    base_url: String,
) -> Result<(String, BTreeSet<String>), FetchError> {
    let (content, links) = tokio::task::spawn_blocking(move || {
        let links = LinkDiscoverer::extract_links(&content, &base_url);
        (content, links)
    })
    .await
    .map_err(|e| FetchError::parse_failure(format!("link extraction aborted: {}", e)))?;
    let links = links.map_err(|e| FetchError::parse_failure(e.to_string()))?;
    Ok((content, links))
}

#[cfg(test)]
#[path = "reqwest_engine_test.rs"]
mod tests;
