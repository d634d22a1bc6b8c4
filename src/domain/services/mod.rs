// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 包含的服务：
/// - 分析插件（analysis_plugin）：爬取结束后对结果做补充分析
/// - 爬取编排（crawl_orchestrator）：工作器池、深度限制、超时重试与取消
/// - 前沿队列（frontier）：去重并带深度标记的广度优先工作队列
/// - 布局评估（layout_evaluator）：判断页面在某个视口下是否符合布局期望
/// - 链接发现（link_discoverer）：提取并过滤页面中的链接
/// - 结果聚合（result_aggregator）：收集判定并生成最终测试结果
pub mod analysis_plugin;
pub mod crawl_orchestrator;
pub mod frontier;
pub mod layout_evaluator;
pub mod link_discoverer;
pub mod result_aggregator;
