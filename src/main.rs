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

use anyhow::Context;
use layoutcrawl::config::settings::Settings;
use layoutcrawl::domain::models::test_results::TestResults;
use layoutcrawl::domain::services::analysis_plugin::{AnalysisPlugin, DefaultAnalysisPluginStub};
use layoutcrawl::domain::services::crawl_orchestrator::CrawlOrchestrator;
use layoutcrawl::domain::services::layout_evaluator::StructuralLayoutEvaluator;
use layoutcrawl::engines::reqwest_engine::ReqwestEngine;
use layoutcrawl::infrastructure::{metrics, results_writer};
use layoutcrawl::utils::robots::RobotsChecker;
use layoutcrawl::utils::telemetry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 主函数
///
/// 用法：`layoutcrawl [CONFIG_PATH]`。未指定路径时读取可选的 `config/default` 文件。
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    let config_path = std::env::args().nth(1);
    let settings =
        Settings::load(config_path.as_deref()).context("failed to load configuration")?;

    // 2. Initialize logging and metrics
    telemetry::init_telemetry(&settings.logging.level, settings.logging.json);
    info!("Starting layoutcrawl...");

    if let Some(addr) = &settings.metrics.listen_addr {
        metrics::init_metrics(addr)?;
    }

    // 3. Initialize components
    let engine = ReqwestEngine::new(
        &settings.crawler.user_agent,
        Duration::from_secs(settings.crawler.fetch_timeout_secs),
    )?;
    let evaluator = Arc::new(StructuralLayoutEvaluator::new());
    let mut orchestrator =
        CrawlOrchestrator::new(settings.crawl_config(), Arc::new(engine.clone()), evaluator);
    if settings.crawler.respect_robots {
        orchestrator =
            orchestrator.with_robots(Arc::new(RobotsChecker::new(engine.client().clone())));
    }

    // 4. Wire Ctrl-C to cancellation
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received, finishing in-flight pages");
                cancel.cancel();
            }
        });
    }

    // 5. Crawl and write results
    let results = orchestrator.run(cancel).await?;
    results_writer::write_results(&results, &settings.results_file).await?;
    info!(summary = %results.summary, "Layout test run complete");

    if results.stats.failed > 0 {
        warn!(failed = results.stats.failed, "Some verdicts failed");
    }

    // 6. Optional analysis
    if settings.analysis.enabled {
        run_analysis(&settings, &results).await;
    }

    Ok(())
}

/// 在超时限制内运行分析插件；插件失败不影响已经写入的结果
async fn run_analysis(settings: &Settings, results: &TestResults) {
    let plugin = DefaultAnalysisPluginStub;
    let timeout = Duration::from_secs(settings.analysis.timeout_secs);

    match tokio::time::timeout(timeout, plugin.analyze_results(results)).await {
        Ok(analysis) => {
            info!(plugin = plugin.name(), analysis = %analysis, "Analysis finished");
            if let Some(path) = &settings.analysis.output_file {
                if let Err(e) = results_writer::write_text(path, &analysis).await {
                    warn!(error = %e, "Failed to write analysis output");
                }
            }
        }
        Err(_) => warn!(plugin = plugin.name(), ?timeout, "Analysis timed out"),
    }
}
