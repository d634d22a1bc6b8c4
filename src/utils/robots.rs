// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

/// Robots.txt检查器接口
#[async_trait]
pub trait RobotsCheckerTrait: Send + Sync {
    /// 检查URL是否被允许访问
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool>;
}

/// 缓存的Robots.txt内容
///
/// 同一源站的并发请求共享一次获取
struct CachedRobots {
    content: OnceCell<String>,
    expires_at: Instant,
}

/// Robots.txt检查器
///
/// 按源站缓存 robots.txt；获取失败或非成功状态时视为允许全部
#[derive(Clone)]
pub struct RobotsChecker {
    client: Client,
    cache: Arc<DashMap<String, Arc<CachedRobots>>>,
    ttl: Duration,
    fetch_timeout: Duration,
}

impl Default for RobotsChecker {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl RobotsCheckerTrait for RobotsChecker {
    async fn is_allowed(&self, url_str: &str, user_agent: &str) -> Result<bool> {
        let content = self.get_robots_content(url_str).await?;
        if content.is_empty() {
            return Ok(true);
        }
        let mut matcher = DefaultMatcher::default();
        Ok(matcher.one_agent_allowed_by_robots(&content, product_token(user_agent), url_str))
    }
}

impl RobotsChecker {
    /// 创建新的Robots检查器实例
    pub fn new(client: Client) -> Self {
        Self {
            client,
            cache: Arc::new(DashMap::new()),
            ttl: Duration::from_secs(3600),
            fetch_timeout: Duration::from_secs(5),
        }
    }

    /// 计算URL对应的 robots.txt 地址
    pub fn robots_url(url_str: &str) -> Result<String> {
        let url = Url::parse(url_str)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("URL has no host: {}", url_str))?;
        Ok(match url.port() {
            Some(port) => format!("{}://{}:{}/robots.txt", url.scheme(), host, port),
            None => format!("{}://{}/robots.txt", url.scheme(), host),
        })
    }

    /// 获取Robots.txt内容（带缓存）
    async fn get_robots_content(&self, url_str: &str) -> Result<String> {
        let robots_url = Self::robots_url(url_str)?;

        // the shard guard must be released before awaiting
        let cached = {
            let now = Instant::now();
            let mut entry = self
                .cache
                .entry(robots_url.clone())
                .or_insert_with(|| self.empty_entry(now));
            if entry.expires_at <= now {
                *entry = self.empty_entry(now);
            }
            Arc::clone(entry.value())
        };

        let content = cached
            .content
            .get_or_init(|| self.fetch_robots(&robots_url))
            .await;
        Ok(content.clone())
    }

    fn empty_entry(&self, now: Instant) -> Arc<CachedRobots> {
        Arc::new(CachedRobots {
            content: OnceCell::new(),
            expires_at: now + self.ttl,
        })
    }

    async fn fetch_robots(&self, robots_url: &str) -> String {
        match self
            .client
            .get(robots_url)
            .timeout(self.fetch_timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
            Ok(resp) => {
                // 404 means no robots.txt, other statuses are treated the same
                debug!(status = %resp.status(), url = %robots_url, "No usable robots.txt");
                String::new()
            }
            Err(e) => {
                warn!("Failed to fetch robots.txt from {}: {}", robots_url, e);
                String::new()
            }
        }
    }
}

/// User-Agent 中用于 robots.txt 匹配的产品名，例如 `layoutcrawl/0.1` 取 `layoutcrawl`
fn product_token(user_agent: &str) -> &str {
    user_agent
        .split(['/', ' '])
        .next()
        .filter(|t| !t.is_empty())
        .unwrap_or(user_agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_robots_url() {
        assert_eq!(
            RobotsChecker::robots_url("https://a.test/x/y?z").unwrap(),
            "https://a.test/robots.txt"
        );
        assert_eq!(
            RobotsChecker::robots_url("http://127.0.0.1:8080/x").unwrap(),
            "http://127.0.0.1:8080/robots.txt"
        );
        assert!(RobotsChecker::robots_url("not a url").is_err());
    }

    #[test]
    fn test_product_token() {
        assert_eq!(product_token("layoutcrawl/0.1"), "layoutcrawl");
        assert_eq!(product_token("Mozilla/5.0 (compatible)"), "Mozilla");
        assert_eq!(product_token("bot"), "bot");
    }

    #[tokio::test]
    async fn test_disallow_rules_are_applied_and_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let checker = RobotsChecker::default();
        let public = format!("{}/public", server.uri());
        let private = format!("{}/private/page", server.uri());

        assert!(checker.is_allowed(&public, "layoutcrawl/0.1").await.unwrap());
        assert!(!checker.is_allowed(&private, "layoutcrawl/0.1").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_robots_allows_everything() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let checker = RobotsChecker::default();
        let url = format!("{}/anything", server.uri());
        assert!(checker.is_allowed(&url, "layoutcrawl").await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_lookups_fetch_robots_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private\n")
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let checker = RobotsChecker::default();
        let urls: Vec<String> = (0..5).map(|i| format!("{}/page/{}", server.uri(), i)).collect();
        let results = futures::future::join_all(
            urls.iter().map(|url| checker.is_allowed(url, "layoutcrawl/0.1")),
        )
        .await;

        assert!(results.into_iter().all(|r| r.unwrap()));
        assert_eq!(checker.cache.len(), 1);
    }
}
