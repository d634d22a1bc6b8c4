// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 爬取任务
///
/// 由前沿队列创建，`url` 已经规范化。创建后不可修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlTask {
    url: String,
    depth: u32,
}

impl CrawlTask {
    pub(crate) fn new(url: String, depth: u32) -> Self {
        Self { url, depth }
    }

    /// 规范化后的绝对URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 距离起始URL的链接跳数
    pub fn depth(&self) -> u32 {
        self.depth
    }
}
