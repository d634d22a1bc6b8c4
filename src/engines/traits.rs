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
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 抓取错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchErrorKind {
    /// 超时
    Timeout,
    /// 网络错误（连接失败、HTTP错误状态等）
    Network,
    /// 响应无法解析
    ParseFailure,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchErrorKind::Timeout => write!(f, "timeout"),
            FetchErrorKind::Network => write!(f, "network"),
            FetchErrorKind::ParseFailure => write!(f, "parse_failure"),
        }
    }
}

/// 抓取错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Timeout, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::Network, message)
    }

    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::new(FetchErrorKind::ParseFailure, message)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::timeout(e.to_string())
        } else if e.is_decode() || e.is_body() {
            FetchError::parse_failure(e.to_string())
        } else {
            FetchError::network(e.to_string())
        }
    }
}

/// 页面抓取特质
///
/// 给定URL，返回页面内容和页面中的外链。实现可以是HTTP客户端、
/// 无头浏览器或测试用的内存站点。
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// 抓取页面
    async fn fetch(&self, url: &str) -> Result<PageSnapshot, FetchError>;

    /// 抓取器名称
    fn name(&self) -> &'static str;
}
