// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_task::CrawlTask;
use crate::utils::errors::UrlError;
use crate::utils::url_utils::{normalize_url, Fingerprint, NormalizedUrl};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// 前沿队列内部状态
///
/// 所有字段只能在持有锁时访问
#[derive(Default)]
struct FrontierState {
    /// 已接受的URL指纹
    visited: HashSet<Fingerprint>,
    /// 待分发任务（FIFO）
    pending: VecDeque<CrawlTask>,
    /// 已分发但尚未 `mark_done` 的任务数
    in_flight: usize,
    /// 关闭后不再分发或接受任务
    closed: bool,
}

/// URL前沿队列
///
/// 去重、带深度标记的广度优先工作队列。一个指纹最多被分发一次，
/// 分发出去的任务深度不超过 `max_depth`。
pub struct Frontier {
    max_depth: u32,
    max_pages: Option<usize>,
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    /// 创建新的前沿队列
    ///
    /// # 参数
    ///
    /// * `max_depth` - 允许的最大深度
    pub fn new(max_depth: u32) -> Self {
        Self {
            max_depth,
            max_pages: None,
            state: Mutex::new(FrontierState::default()),
            notify: Notify::new(),
        }
    }

    /// 限制最多接受的URL数量
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// 放入种子URL
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - URL被接受
    /// * `Ok(false)` - URL已存在、深度超限或队列已关闭
    /// * `Err(UrlError)` - URL无法规范化为绝对地址
    pub fn seed(&self, url: &str, depth: u32) -> Result<bool, UrlError> {
        let normalized = normalize_url(url)?;
        Ok(self.enqueue_normalized(normalized, depth))
    }

    /// 尝试入队
    ///
    /// 规范化并计算指纹。指纹已存在、深度超过 `max_depth`、达到页面上限
    /// 或URL无法解析时返回 false，且不产生任何副作用。
    pub fn try_enqueue(&self, url: &str, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }
        match normalize_url(url) {
            Ok(normalized) => self.enqueue_normalized(normalized, depth),
            Err(e) => {
                warn!(error = %e, "Skipping malformed link");
                false
            }
        }
    }

    fn enqueue_normalized(&self, url: NormalizedUrl, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }
        let fingerprint = url.fingerprint();
        {
            let mut state = self.state.lock();
            if state.closed {
                return false;
            }
            if self
                .max_pages
                .is_some_and(|limit| state.visited.len() >= limit)
            {
                debug!(url = %url, "Page limit reached, not enqueueing");
                return false;
            }
            if !state.visited.insert(fingerprint) {
                return false;
            }
            state.pending.push_back(CrawlTask::new(url.into_string(), depth));
        }
        self.notify.notify_waiters();
        true
    }

    /// 取出下一个任务
    ///
    /// 队列为空但仍有任务在处理中时等待，因为这些任务可能还会产生新的链接。
    /// 队列为空且没有处理中的任务，或队列已关闭时返回 `None`。
    /// 每个返回的任务都必须在处理完后调用一次 [`Frontier::mark_done`]。
    pub async fn next(&self) -> Option<CrawlTask> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting state so a wakeup between the check and the await is not lost
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.closed {
                    return None;
                }
                if let Some(task) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }
                if state.in_flight == 0 {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// 标记一个已分发的任务处理完成
    pub fn mark_done(&self) {
        let drained = {
            let mut state = self.state.lock();
            debug_assert!(state.in_flight > 0, "mark_done called without a dispatched task");
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0 && state.pending.is_empty()
        };
        if drained {
            self.notify.notify_waiters();
        }
    }

    /// 关闭队列
    ///
    /// 停止分发剩余任务并唤醒所有等待者；处理中的任务不受影响
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// 已接受的不同URL数量
    pub fn visited_count(&self) -> usize {
        self.state.lock().visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.state.lock().in_flight
    }
}

#[cfg(test)]
#[path = "frontier_test.rs"]
mod tests;
