// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::start_site;
use layoutcrawl::config::settings::Settings;
use layoutcrawl::domain::models::layout_verdict::FailureKind;
use layoutcrawl::domain::models::test_results::TestResults;
use layoutcrawl::domain::models::viewport::Viewport;
use layoutcrawl::domain::services::crawl_orchestrator::{CrawlConfig, CrawlOrchestrator};
use layoutcrawl::domain::services::layout_evaluator::StructuralLayoutEvaluator;
use layoutcrawl::engines::reqwest_engine::{ReqwestEngine, DEFAULT_USER_AGENT};
use layoutcrawl::infrastructure::results_writer::write_results;
use layoutcrawl::utils::retry_policy::RetryPolicy;
use layoutcrawl::utils::robots::RobotsChecker;
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn engine() -> Arc<ReqwestEngine> {
    Arc::new(ReqwestEngine::new(DEFAULT_USER_AGENT, Duration::from_secs(10)).unwrap())
}

fn site_config(site: &str, max_depth: u32) -> CrawlConfig {
    CrawlConfig::new(site, max_depth, Viewport::defaults(), "default")
        .with_workers(3)
        .with_fetch_timeout(Duration::from_secs(10))
        .with_retry_policy(RetryPolicy::none())
}

fn reached_paths(site: &str, results: &TestResults) -> BTreeSet<String> {
    results
        .verdicts
        .iter()
        .map(|v| v.url.trim_start_matches(site).to_string())
        .collect()
}

#[tokio::test]
async fn test_crawl_local_site() {
    let site = start_site().await;
    let orchestrator = CrawlOrchestrator::new(
        site_config(&site, 2),
        engine(),
        Arc::new(StructuralLayoutEvaluator::new()),
    );

    let results = orchestrator.run(CancellationToken::new()).await.unwrap();

    let paths = reached_paths(&site, &results);
    let expected: BTreeSet<String> = ["", "/about", "/wide", "/missing", "/private"]
        .iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(paths, expected);
    assert_eq!(results.stats.pages, 5);
    assert_eq!(results.verdicts.len(), 15);

    let missing: Vec<_> = results
        .verdicts
        .iter()
        .filter(|v| v.url.ends_with("/missing"))
        .collect();
    assert_eq!(missing.len(), 3);
    assert!(missing
        .iter()
        .all(|v| v.failure == Some(FailureKind::Network) && v.detail.contains("404")));

    let wide: Vec<_> = results
        .verdicts
        .iter()
        .filter(|v| v.url.ends_with("/wide"))
        .collect();
    for verdict in wide {
        if verdict.viewport_name == "desktop" {
            assert!(verdict.passed, "{}", verdict.detail);
        } else {
            assert_eq!(verdict.failure, Some(FailureKind::Layout));
            assert!(verdict.detail.contains("<table width=1200>"), "{}", verdict.detail);
        }
    }

    let about_passed = results
        .verdicts
        .iter()
        .filter(|v| v.url.ends_with("/about"))
        .all(|v| v.passed);
    assert!(about_passed);
}

#[tokio::test]
async fn test_crawl_respects_robots_txt() {
    let site = start_site().await;
    let orchestrator = CrawlOrchestrator::new(
        site_config(&site, 1),
        engine(),
        Arc::new(StructuralLayoutEvaluator::new()),
    )
    .with_robots(Arc::new(RobotsChecker::default()));

    let results = orchestrator.run(CancellationToken::new()).await.unwrap();

    let paths = reached_paths(&site, &results);
    assert!(!paths.contains("/private"));
    assert!(paths.contains("/about"));
    assert_eq!(results.stats.pages, 4);
}

#[tokio::test]
async fn test_crawl_from_settings_file_and_write_report() {
    let site = start_site().await;
    let dir = tempfile::tempdir().unwrap();
    let results_path = dir.path().join("reports/results.json");

    let mut config_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    write!(
        config_file,
        r#"
start_url = "{site}/"
max_depth = 1
results_file = "{results}"

[ui]
expected_layout = "require: nav"
viewports = [{{ name = "mobile", width = 375, height = 667 }}]

[crawler]
workers = 2
max_retries = 0
exclude_patterns = ["/private", "/missing"]
"#,
        site = site,
        results = results_path.display()
    )
    .unwrap();
    config_file.flush().unwrap();

    let settings = Settings::from_file(config_file.path().to_str().unwrap()).unwrap();
    let orchestrator = CrawlOrchestrator::new(
        settings.crawl_config(),
        engine(),
        Arc::new(StructuralLayoutEvaluator::new()),
    );
    let results = orchestrator.run(CancellationToken::new()).await.unwrap();
    write_results(&results, &settings.results_file).await.unwrap();

    assert_eq!(
        reached_paths(&site, &results),
        BTreeSet::from(["".to_string(), "/about".to_string(), "/wide".to_string()])
    );
    let wide = results
        .verdicts
        .iter()
        .find(|v| v.url.ends_with("/wide"))
        .unwrap();
    assert!(wide.detail.contains("required element `nav` not found"));

    let written: TestResults =
        serde_json::from_str(&tokio::fs::read_to_string(&results_path).await.unwrap()).unwrap();
    assert_eq!(written.verdicts, results.verdicts);
    assert_eq!(written.summary, results.summary);
}
