// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod crawl_task;
pub mod layout_verdict;
pub mod page_snapshot;
pub mod test_results;
pub mod viewport;
