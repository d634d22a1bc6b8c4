// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// URL错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("无效URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl UrlError {
    pub fn invalid(url: impl Into<String>, reason: impl Into<String>) -> Self {
        UrlError::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// 布局评估错误类型
///
/// 评估器无法给出结论时返回，调用方会将其转换为失败的判定
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("页面快照损坏: {0}")]
    CorruptSnapshot(String),

    #[error("无效的布局期望: {0}")]
    InvalidExpectation(String),
}

/// 结果聚合错误类型
///
/// 表示调用方违反了聚合器的使用约定
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("结果已经汇总完成，不能重复汇总")]
    AlreadyFinalized,

    #[error("结果汇总完成后不能再提交判定")]
    SubmitAfterFinalize,
}

/// 爬取运行错误类型
///
/// 仅包含会导致整次运行中止的错误
#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("起始URL无效: {0}")]
    InvalidStartUrl(#[source] UrlError),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("聚合错误: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("工作器异常退出: {0}")]
    Worker(String),
}

/// 结果文件写入错误类型
#[derive(Error, Debug)]
pub enum ResultsWriteError {
    #[error("结果序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("写入文件 `{path}` 失败: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
