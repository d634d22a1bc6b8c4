// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::FetchErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 判定失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// 抓取超时
    Timeout,
    /// 网络错误
    Network,
    /// 响应解析失败
    ParseFailure,
    /// 评估器无法给出结论
    Evaluation,
    /// 页面不符合布局期望
    Layout,
}

impl From<FetchErrorKind> for FailureKind {
    fn from(kind: FetchErrorKind) -> Self {
        match kind {
            FetchErrorKind::Timeout => FailureKind::Timeout,
            FetchErrorKind::Network => FailureKind::Network,
            FetchErrorKind::ParseFailure => FailureKind::ParseFailure,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network"),
            FailureKind::ParseFailure => write!(f, "parse_failure"),
            FailureKind::Evaluation => write!(f, "evaluation"),
            FailureKind::Layout => write!(f, "layout"),
        }
    }
}

/// 布局判定
///
/// 每个 (URL, 视口) 组合产生一条，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutVerdict {
    pub url: String,
    pub viewport_name: String,
    pub passed: bool,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl LayoutVerdict {
    pub fn pass(url: impl Into<String>, viewport_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            viewport_name: viewport_name.into(),
            passed: true,
            detail: detail.into(),
            failure: None,
        }
    }

    pub fn fail(
        url: impl Into<String>,
        viewport_name: impl Into<String>,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            viewport_name: viewport_name.into(),
            passed: false,
            detail: detail.into(),
            failure: Some(kind),
        }
    }
}
