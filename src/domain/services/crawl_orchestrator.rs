// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_task::CrawlTask;
use crate::domain::models::layout_verdict::{FailureKind, LayoutVerdict};
use crate::domain::models::page_snapshot::PageSnapshot;
use crate::domain::models::test_results::TestResults;
use crate::domain::models::viewport::Viewport;
use crate::domain::services::frontier::Frontier;
use crate::domain::services::layout_evaluator::LayoutEvaluator;
use crate::domain::services::link_discoverer::LinkFilter;
use crate::domain::services::result_aggregator::ResultAggregator;
use crate::engines::reqwest_engine::DEFAULT_USER_AGENT;
use crate::engines::traits::{FetchError, PageFetcher};
use crate::utils::errors::CrawlError;
use crate::utils::retry_policy::RetryPolicy;
use crate::utils::robots::RobotsCheckerTrait;
use futures::future::join_all;
use futures::FutureExt;
use metrics::{counter, histogram};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// 爬取配置
///
/// 在运行开始前构建，运行期间不可修改
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    pub start_url: String,
    /// 最大链接深度，起始页面深度为 0
    pub max_depth: u32,
    pub viewports: Vec<Viewport>,
    pub expected_layout: String,
    pub workers: usize,
    /// 单次抓取（含读取响应体）的超时时间
    pub fetch_timeout: Duration,
    /// 每次抓取前的等待时间
    pub crawl_delay: Duration,
    pub retry_policy: RetryPolicy,
    pub link_filter: LinkFilter,
    /// 用于 robots.txt 匹配
    pub user_agent: String,
    pub max_pages: Option<usize>,
}

impl CrawlConfig {
    /// 使用默认的并发、超时和过滤参数创建配置
    pub fn new(
        start_url: impl Into<String>,
        max_depth: u32,
        viewports: Vec<Viewport>,
        expected_layout: impl Into<String>,
    ) -> Self {
        let start_url = start_url.into();
        let link_filter = LinkFilter::new(&start_url, true, Vec::new(), Vec::new());
        Self {
            start_url,
            max_depth,
            viewports,
            expected_layout: expected_layout.into(),
            workers: 4,
            fetch_timeout: Duration::from_secs(30),
            crawl_delay: Duration::ZERO,
            retry_policy: RetryPolicy::default(),
            link_filter,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_pages: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_link_filter(mut self, filter: LinkFilter) -> Self {
        self.link_filter = filter;
        self
    }

    pub fn with_crawl_delay(mut self, delay: Duration) -> Self {
        self.crawl_delay = delay;
        self
    }

    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }
}

/// 爬取编排器
///
/// 驱动固定数量的工作器从前沿队列取任务，抓取页面、按视口评估并提交判定，
/// 所有工作器结束后汇总结果。
pub struct CrawlOrchestrator {
    config: Arc<CrawlConfig>,
    fetcher: Arc<dyn PageFetcher>,
    evaluator: Arc<dyn LayoutEvaluator>,
    robots: Option<Arc<dyn RobotsCheckerTrait>>,
}

impl CrawlOrchestrator {
    pub fn new(
        config: CrawlConfig,
        fetcher: Arc<dyn PageFetcher>,
        evaluator: Arc<dyn LayoutEvaluator>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            evaluator,
            robots: None,
        }
    }

    /// 发现的链接在入队前需要通过 robots.txt 检查
    pub fn with_robots(mut self, robots: Arc<dyn RobotsCheckerTrait>) -> Self {
        self.robots = Some(robots);
        self
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// 执行一次完整的爬取
    ///
    /// 只有配置错误、起始URL无效和聚合约定被破坏会返回错误；
    /// 单个页面的抓取或评估失败都会变成失败的判定。
    /// 取消后不再分发新任务，处理中的页面完成后返回部分结果。
    pub async fn run(&self, cancel: CancellationToken) -> Result<TestResults, CrawlError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("crawl_run", %run_id, start_url = %self.config.start_url);
        self.run_inner(cancel).instrument(span).await
    }

    async fn run_inner(&self, cancel: CancellationToken) -> Result<TestResults, CrawlError> {
        let config = &self.config;
        if config.viewports.is_empty() {
            return Err(CrawlError::Config("at least one viewport is required".to_string()));
        }
        if let Some(name) = Viewport::duplicate_name(&config.viewports) {
            return Err(CrawlError::Config(format!("duplicate viewport name `{}`", name)));
        }
        if config.workers == 0 {
            return Err(CrawlError::Config("worker count must be positive".to_string()));
        }
        self.evaluator
            .validate_expectation(&config.expected_layout)
            .map_err(|e| CrawlError::Config(e.to_string()))?;

        let frontier = Arc::new(Frontier::new(config.max_depth).with_max_pages(config.max_pages));
        frontier
            .seed(&config.start_url, 0)
            .map_err(CrawlError::InvalidStartUrl)?;
        let aggregator = Arc::new(ResultAggregator::new());

        info!(
            workers = config.workers,
            max_depth = config.max_depth,
            viewports = config.viewports.len(),
            evaluator = self.evaluator.name(),
            fetcher = self.fetcher.name(),
            "Starting crawl"
        );

        let watcher = {
            let frontier = Arc::clone(&frontier);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                info!("Cancellation requested, no further pages will be dispatched");
                frontier.close();
            })
        };

        let mut handles = Vec::with_capacity(config.workers);
        for worker_id in 0..config.workers {
            let worker = CrawlWorker {
                frontier: Arc::clone(&frontier),
                aggregator: Arc::clone(&aggregator),
                config: Arc::clone(&self.config),
                fetcher: Arc::clone(&self.fetcher),
                evaluator: Arc::clone(&self.evaluator),
                robots: self.robots.clone(),
                cancel: cancel.clone(),
            };
            let span = info_span!("worker", worker_id);
            handles.push(tokio::spawn(worker.run().instrument(span)));
        }

        let mut failure = None;
        for handle in handles {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    frontier.close();
                    Err(CrawlError::Worker(e.to_string()))
                }
            };
            if let Err(e) = outcome {
                warn!(error = %e, "Worker stopped with error");
                failure.get_or_insert(e);
            }
        }
        watcher.abort();

        if let Some(e) = failure {
            return Err(e);
        }

        let results = aggregator.finalize()?;
        info!(
            pages = results.stats.pages,
            passed = results.stats.passed,
            failed = results.stats.failed,
            cancelled = cancel.is_cancelled(),
            "Crawl finished"
        );
        Ok(results)
    }
}

/// 确保每个分发出去的任务都恰好调用一次 `mark_done`，包括处理过程中 panic 的情况
struct DoneGuard<'a>(&'a Frontier);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_done();
    }
}

struct CrawlWorker {
    frontier: Arc<Frontier>,
    aggregator: Arc<ResultAggregator>,
    config: Arc<CrawlConfig>,
    fetcher: Arc<dyn PageFetcher>,
    evaluator: Arc<dyn LayoutEvaluator>,
    robots: Option<Arc<dyn RobotsCheckerTrait>>,
    cancel: CancellationToken,
}

impl CrawlWorker {
    async fn run(self) -> Result<(), CrawlError> {
        debug!("Worker started");
        while let Some(task) = self.frontier.next().await {
            let _done = DoneGuard(&self.frontier);
            let span = info_span!("page", url = %task.url(), depth = task.depth());
            if let Err(e) = self.process(&task).instrument(span).await {
                self.frontier.close();
                return Err(e);
            }
        }
        debug!("Worker finished");
        Ok(())
    }

    async fn process(&self, task: &CrawlTask) -> Result<(), CrawlError> {
        if !self.config.crawl_delay.is_zero() {
            tokio::time::sleep(self.config.crawl_delay).await;
        }

        let snapshot = match self.fetch_with_retry(task.url()).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                warn!(kind = %e.kind, error = %e.message, "Fetch failed");
                counter!("layoutcrawl_fetch_failures_total", "kind" => e.kind.to_string())
                    .increment(1);
                for viewport in &self.config.viewports {
                    self.submit(LayoutVerdict::fail(
                        task.url(),
                        &viewport.name,
                        e.kind.into(),
                        format!("fetch failed: {}", e.message),
                    ))?;
                }
                return Ok(());
            }
        };

        counter!("layoutcrawl_pages_fetched_total").increment(1);
        debug!(
            status = snapshot.status_code,
            links = snapshot.links.len(),
            response_time_ms = snapshot.response_time_ms,
            "Page fetched"
        );

        self.evaluate_viewports(task, &snapshot).await?;

        if task.depth() < self.frontier.max_depth() {
            self.enqueue_links(&snapshot, task.depth() + 1).await;
        }
        Ok(())
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        let policy = &self.config.retry_policy;
        let mut retries = 0;
        loop {
            let started = Instant::now();
            // a panicking fetcher fails this page only, never the worker
            let attempt = AssertUnwindSafe(self.fetcher.fetch(url)).catch_unwind();
            let result = match tokio::time::timeout(self.config.fetch_timeout, attempt).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => {
                    histogram!("layoutcrawl_fetch_duration_seconds")
                        .record(started.elapsed().as_secs_f64());
                    let message = panic_message(panic.as_ref());
                    warn!(panic = %message, fetcher = self.fetcher.name(), "Fetcher panicked");
                    return Err(FetchError::network(format!("fetcher panicked: {}", message)));
                }
                Err(_) => Err(FetchError::timeout(format!(
                    "no response within {:?}",
                    self.config.fetch_timeout
                ))),
            };
            histogram!("layoutcrawl_fetch_duration_seconds").record(started.elapsed().as_secs_f64());

            match result {
                Err(e) if policy.should_retry(retries, &e) && !self.cancel.is_cancelled() => {
                    retries += 1;
                    let backoff = policy.calculate_backoff(retries);
                    debug!(retries, ?backoff, error = %e, "Retrying fetch");
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = self.cancel.cancelled() => return Err(e),
                    }
                }
                other => return other,
            }
        }
    }

    /// 所有视口并发评估，每个视口恰好产生一条判定
    async fn evaluate_viewports(
        &self,
        task: &CrawlTask,
        snapshot: &Arc<PageSnapshot>,
    ) -> Result<(), CrawlError> {
        let evaluations = self.config.viewports.iter().cloned().map(|viewport| {
            let evaluator = Arc::clone(&self.evaluator);
            let snapshot = Arc::clone(snapshot);
            let config = Arc::clone(&self.config);
            async move {
                let viewport_name = viewport.name.clone();
                // HTML parsing and selector matching are CPU bound
                let outcome = tokio::task::spawn_blocking(move || {
                    evaluator.evaluate(&snapshot, &viewport, &config.expected_layout)
                })
                .await;
                (viewport_name, outcome)
            }
        });

        for (viewport_name, outcome) in join_all(evaluations).await {
            let verdict = match outcome {
                Ok(Ok(mut verdict)) => {
                    verdict.url = task.url().to_string();
                    verdict
                }
                Ok(Err(e)) => {
                    warn!(viewport = %viewport_name, error = %e, "Evaluation failed");
                    LayoutVerdict::fail(task.url(), &viewport_name, FailureKind::Evaluation, e.to_string())
                }
                Err(e) => {
                    warn!(viewport = %viewport_name, error = %e, "Evaluator task aborted");
                    LayoutVerdict::fail(
                        task.url(),
                        &viewport_name,
                        FailureKind::Evaluation,
                        format!("evaluator task failed: {}", e),
                    )
                }
            };
            self.submit(verdict)?;
        }
        Ok(())
    }

    async fn enqueue_links(&self, snapshot: &PageSnapshot, depth: u32) {
        let mut enqueued = 0u64;
        for link in &snapshot.links {
            if !self.config.link_filter.allows(link) {
                continue;
            }
            if let Some(robots) = &self.robots {
                match robots.is_allowed(link, &self.config.user_agent).await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(link = %link, "Disallowed by robots.txt");
                        continue;
                    }
                    Err(e) => {
                        // unreadable robots rules do not block crawling
                        debug!(link = %link, error = %e, "Robots check failed");
                    }
                }
            }
            if self.frontier.try_enqueue(link, depth) {
                enqueued += 1;
            }
        }
        if enqueued > 0 {
            counter!("layoutcrawl_links_enqueued_total").increment(enqueued);
            debug!(enqueued, depth, "Links enqueued");
        }
    }

    fn submit(&self, verdict: LayoutVerdict) -> Result<(), CrawlError> {
        let passed = if verdict.passed { "true" } else { "false" };
        self.aggregator.submit(verdict)?;
        counter!("layoutcrawl_verdicts_total", "passed" => passed).increment(1);
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "crawl_orchestrator_test.rs"]
mod tests;
