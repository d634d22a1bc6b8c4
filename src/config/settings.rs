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

use crate::domain::models::viewport::Viewport;
use crate::domain::services::crawl_orchestrator::CrawlConfig;
use crate::domain::services::link_discoverer::LinkFilter;
use crate::engines::reqwest_engine::DEFAULT_USER_AGENT;
use crate::utils::retry_policy::RetryPolicy;
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError, ValidationErrors};

/// 配置加载错误
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("配置加载失败: {0}")]
    Load(#[from] ConfigError),

    #[error("配置校验失败: {0}")]
    Validation(#[from] ValidationErrors),
}

/// 应用程序配置设置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    /// 爬取起始URL
    #[validate(url)]
    pub start_url: String,
    /// 最大链接深度，起始页面深度为 0
    #[validate(range(max = 32))]
    pub max_depth: u32,
    /// 结果 JSON 文件路径
    #[validate(length(min = 1))]
    pub results_file: String,
    /// 界面测试配置
    #[validate(nested)]
    pub ui: UiSettings,
    /// 日志配置
    pub logging: LoggingSettings,
    /// 爬虫配置
    #[validate(nested)]
    pub crawler: CrawlerSettings,
    /// 分析插件配置
    #[validate(nested)]
    pub analysis: AnalysisSettings,
    /// 指标配置
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// 界面测试配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UiSettings {
    /// 布局期望，例如 `default` 或 `require: header; no-overflow`
    pub expected_layout: String,
    /// 需要测试的视口，按配置顺序
    #[serde(default = "Viewport::defaults")]
    #[validate(length(min = 1), nested, custom(function = "validate_unique_viewports"))]
    pub viewports: Vec<Viewport>,
}

fn validate_unique_viewports(viewports: &[Viewport]) -> Result<(), ValidationError> {
    match Viewport::duplicate_name(viewports) {
        Some(name) => {
            let mut error = ValidationError::new("duplicate_viewport_name");
            error.message = Some(format!("duplicate viewport name `{}`", name).into());
            Err(error)
        }
        None => Ok(()),
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// 日志级别或 EnvFilter 指令
    pub level: String,
    /// 是否输出 JSON 日志
    pub json: bool,
}

/// 爬虫配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CrawlerSettings {
    /// 工作器数量
    #[validate(range(min = 1, max = 64))]
    pub workers: usize,
    /// 单次抓取超时（秒）
    #[validate(range(min = 1, max = 600))]
    pub fetch_timeout_secs: u64,
    /// 网络错误的最大重试次数
    #[validate(range(max = 10))]
    pub max_retries: u32,
    /// 每次抓取前的等待时间（毫秒）
    #[validate(range(max = 60000))]
    pub crawl_delay_ms: u64,
    #[validate(length(min = 1))]
    pub user_agent: String,
    /// 只爬取起始URL所在主机
    pub same_host_only: bool,
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// 是否遵守 robots.txt
    pub respect_robots: bool,
    /// 最多接受的不同URL数量
    #[validate(range(min = 1))]
    pub max_pages: Option<usize>,
}

/// 分析插件配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalysisSettings {
    pub enabled: bool,
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
    /// 分析输出文件，不设置时只记录日志
    pub output_file: Option<String>,
}

/// 指标配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Prometheus 监听地址，例如 `127.0.0.1:9000`
    pub listen_addr: Option<String>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次应用默认值、可选的 `config/default` 文件和 `LAYOUTCRAWL__` 前缀的环境变量
    pub fn new() -> Result<Self, SettingsError> {
        let builder = Self::builder_with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(Self::environment());
        Self::build(builder)
    }

    /// 从指定文件加载配置
    ///
    /// 文件格式由扩展名决定（toml、yaml、json 等），环境变量优先级高于文件
    pub fn from_file(path: &str) -> Result<Self, SettingsError> {
        let builder = Self::builder_with_defaults()?
            .add_source(File::with_name(path).required(true))
            .add_source(Self::environment());
        Self::build(builder)
    }

    /// 根据命令行参数加载配置
    pub fn load(path: Option<&str>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::new(),
        }
    }

    fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("start_url", "https://example.com")?
            .set_default("max_depth", 3)?
            .set_default("results_file", "results.json")?
            // UI settings; viewports default through serde
            .set_default("ui.expected_layout", "default")?
            // Logging settings
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Crawler settings
            .set_default("crawler.workers", 4)?
            .set_default("crawler.fetch_timeout_secs", 30)?
            .set_default("crawler.max_retries", 2)?
            .set_default("crawler.crawl_delay_ms", 0)?
            .set_default("crawler.user_agent", DEFAULT_USER_AGENT)?
            .set_default("crawler.same_host_only", true)?
            .set_default("crawler.respect_robots", false)?
            // Analysis settings
            .set_default("analysis.enabled", true)?
            .set_default("analysis.timeout_secs", 30)
    }

    fn environment() -> Environment {
        Environment::with_prefix("LAYOUTCRAWL")
            .separator("__")
            .try_parsing(true)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// 生成爬取编排器使用的不可变配置
    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            start_url: self.start_url.clone(),
            max_depth: self.max_depth,
            viewports: self.ui.viewports.clone(),
            expected_layout: self.ui.expected_layout.clone(),
            workers: self.crawler.workers,
            fetch_timeout: Duration::from_secs(self.crawler.fetch_timeout_secs),
            crawl_delay: Duration::from_millis(self.crawler.crawl_delay_ms),
            retry_policy: RetryPolicy::with_max_retries(self.crawler.max_retries),
            link_filter: LinkFilter::new(
                &self.start_url,
                self.crawler.same_host_only,
                self.crawler.include_patterns.clone(),
                self.crawler.exclude_patterns.clone(),
            ),
            user_agent: self.crawler.user_agent.clone(),
            max_pages: self.crawler.max_pages,
        }
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
