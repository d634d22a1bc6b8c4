// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::layout_verdict::LayoutVerdict;
use crate::domain::models::test_results::{ResultStats, TestResults};
use crate::utils::errors::AggregationError;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;

#[derive(Default)]
struct AggregatorState {
    verdicts: Vec<LayoutVerdict>,
    finalized: bool,
}

/// 结果聚合器
///
/// 判定提交的唯一串行化点。可以被多个工作器并发调用 `submit`，
/// 所有工作器结束后调用一次 `finalize`。
#[derive(Default)]
pub struct ResultAggregator {
    state: Mutex<AggregatorState>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 提交判定
    pub fn submit(&self, verdict: LayoutVerdict) -> Result<(), AggregationError> {
        let mut state = self.state.lock();
        if state.finalized {
            return Err(AggregationError::SubmitAfterFinalize);
        }
        state.verdicts.push(verdict);
        Ok(())
    }

    /// 当前已提交的判定数
    pub fn len(&self) -> usize {
        self.state.lock().verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 汇总结果
    ///
    /// 只能调用一次。判定按 (url, viewport_name) 排序，保证输出可复现。
    pub fn finalize(&self) -> Result<TestResults, AggregationError> {
        let mut verdicts = {
            let mut state = self.state.lock();
            if state.finalized {
                return Err(AggregationError::AlreadyFinalized);
            }
            state.finalized = true;
            std::mem::take(&mut state.verdicts)
        };

        verdicts.sort_by(|a, b| {
            a.url
                .cmp(&b.url)
                .then_with(|| a.viewport_name.cmp(&b.viewport_name))
        });

        let passed = verdicts.iter().filter(|v| v.passed).count();
        let stats = ResultStats {
            pages: verdicts
                .iter()
                .map(|v| v.url.as_str())
                .collect::<HashSet<_>>()
                .len(),
            verdicts: verdicts.len(),
            passed,
            failed: verdicts.len() - passed,
        };

        Ok(TestResults {
            summary: summarize(&stats),
            stats,
            generated_at: Utc::now(),
            verdicts,
        })
    }
}

fn summarize(stats: &ResultStats) -> String {
    format!(
        "{} pages, {} verdicts: {} passed, {} failed",
        stats.pages, stats.verdicts, stats.passed, stats.failed
    )
}
