// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::BTreeSet;

/// 页面快照
///
/// 抓取器的产物，只在处理单个任务期间存在，评估完成后即释放。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// 被请求的URL
    pub url: String,
    /// 跟随重定向后的最终URL
    pub final_url: String,
    /// HTTP状态码
    pub status_code: u16,
    /// 内容类型
    pub content_type: String,
    /// 页面原始内容
    pub content: String,
    /// 页面中提取出的绝对外链
    pub links: BTreeSet<String>,
    /// 响应时间（毫秒）
    pub response_time_ms: u64,
}

impl PageSnapshot {
    /// 构造一个 HTML 页面快照，常用于测试和内存抓取器
    pub fn html(url: impl Into<String>, content: impl Into<String>, links: BTreeSet<String>) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            status_code: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            content: content.into(),
            links,
            response_time_ms: 0,
        }
    }

    /// 内容类型是否为 HTML
    pub fn is_html(&self) -> bool {
        let ct = self.content_type.to_ascii_lowercase();
        ct.contains("text/html") || ct.contains("application/xhtml+xml")
    }
}
