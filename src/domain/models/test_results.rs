// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::layout_verdict::LayoutVerdict;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStats {
    /// 产生判定的不同页面数
    pub pages: usize,
    /// 判定总数
    pub verdicts: usize,
    pub passed: usize,
    pub failed: usize,
}

/// 测试结果汇总
///
/// 每次爬取运行只汇总一次，之后交给结果写入器和分析插件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResults {
    pub summary: String,
    pub stats: ResultStats,
    pub generated_at: DateTime<Utc>,
    /// 按 (url, viewport_name) 排序
    pub verdicts: Vec<LayoutVerdict>,
}

impl TestResults {
    /// 所有判定是否都通过
    pub fn all_passed(&self) -> bool {
        self.stats.failed == 0
    }

    /// 失败的判定
    pub fn failures(&self) -> impl Iterator<Item = &LayoutVerdict> {
        self.verdicts.iter().filter(|v| !v.passed)
    }
}
