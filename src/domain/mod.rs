// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// 该模块包含系统的核心业务逻辑，包括：
/// - 领域模型（models）：爬取任务、页面快照、视口、布局判定和测试结果
/// - 服务（services）：前沿队列、链接发现、布局评估、结果聚合和爬取编排
///
/// 领域层只通过特质依赖抓取引擎和 robots 检查器，不依赖具体实现。
pub mod models;
pub mod services;
