// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::info;

/// 指标初始化错误
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("无效的指标监听地址 `{addr}`: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("无法安装 Prometheus 导出器: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}

/// 初始化指标系统
///
/// 在 `listen_addr` 上暴露 Prometheus 抓取端点，并注册爬取相关的指标说明。
/// 未调用时指标宏为空操作。
pub fn init_metrics(listen_addr: &str) -> Result<SocketAddr, MetricsError> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|source| MetricsError::InvalidAddress {
            addr: listen_addr.to_string(),
            source,
        })?;

    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_metrics();

    info!("Metrics exporter listening on {}", addr);
    Ok(addr)
}

fn describe_metrics() {
    describe_counter!(
        "layoutcrawl_pages_fetched_total",
        "Total number of pages fetched successfully"
    );
    describe_counter!(
        "layoutcrawl_fetch_failures_total",
        "Total number of pages that could not be fetched, by failure kind"
    );
    describe_counter!(
        "layoutcrawl_verdicts_total",
        "Total number of layout verdicts submitted, by outcome"
    );
    describe_counter!(
        "layoutcrawl_links_enqueued_total",
        "Total number of discovered links accepted into the frontier"
    );
    describe_histogram!(
        "layoutcrawl_fetch_duration_seconds",
        Unit::Seconds,
        "Duration of individual fetch attempts in seconds"
    );
}
