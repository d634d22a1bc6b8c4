// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 构建日志过滤器
///
/// `RUST_LOG` 优先；否则使用配置的级别，无法解析时回退到 `info`
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(level))
}

/// 按配置的级别构建过滤器，不读取环境变量
pub fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化日志系统
///
/// # 参数
///
/// * `level` - 日志级别或 EnvFilter 指令，例如 `info` 或 `layoutcrawl=debug`
/// * `json` - 是否输出 JSON 格式日志
pub fn init_telemetry(level: &str, json: bool) {
    let filter = build_filter(level);
    let registry = tracing_subscriber::registry().with(filter);

    // try_init: tests and embedders may have installed a subscriber already
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    if let Err(e) = result {
        eprintln!("logging already initialised: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_accepts_directives() {
        let filter = level_filter("warn,layoutcrawl=debug");
        assert!(filter.to_string().contains("layoutcrawl=debug"));
    }

    #[test]
    fn test_level_filter_falls_back_to_info() {
        let filter = level_filter("layoutcrawl=loud");
        assert_eq!(filter.to_string(), "info");
    }
}
