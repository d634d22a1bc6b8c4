// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::test_results::TestResults;
use async_trait::async_trait;
use tracing::info;

/// 结果分析插件特质
///
/// 爬取结果写入后调用，返回的文本作为不透明的补充输出
#[async_trait]
pub trait AnalysisPlugin: Send + Sync {
    async fn analyze_results(&self, results: &TestResults) -> String;

    fn name(&self) -> &'static str;
}

/// 默认的AI分析插件占位实现
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAnalysisPluginStub;

#[async_trait]
impl AnalysisPlugin for DefaultAnalysisPluginStub {
    async fn analyze_results(&self, results: &TestResults) -> String {
        info!(
            verdicts = results.stats.verdicts,
            "AI analysis plugin not implemented"
        );
        "AI analysis not available".to_string()
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}
