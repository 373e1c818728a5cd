//! Poll intervals, settle delays and retry budgets (`[timing]` table).

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Delay between result list polls.
    pub poll_interval_ms: u64,
    /// Consecutive unproductive polls before a crawl gives up.
    pub stall_budget: u32,
    /// Wait after clicking an entry before reading the detail view.
    pub settle_after_click_ms: u64,
    /// Wait after navigating back to the list.
    pub settle_after_back_ms: u64,
    /// Wait after the start page loads.
    pub start_page_settle_ms: u64,
    /// Wait after scrolling an entry into view before clicking.
    pub scroll_into_view_ms: u64,
    /// Deadline for single elements (search input, click readiness).
    pub element_wait_secs: u64,
    /// Deadline for the result list container to appear.
    pub list_wait_secs: u64,
    /// Total attempts for retryable session operations.
    pub max_retries: u32,
    /// Fixed delay between retry attempts.
    pub retry_backoff_ms: u64,
    /// Nesting limit for the aggregate-entry scan.
    pub max_scan_depth: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            stall_budget: 10,
            settle_after_click_ms: 1500,
            settle_after_back_ms: 1000,
            start_page_settle_ms: 2000,
            scroll_into_view_ms: 500,
            element_wait_secs: 5,
            list_wait_secs: 10,
            max_retries: 3,
            retry_backoff_ms: 1000,
            max_scan_depth: 32,
        }
    }
}

impl Timing {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_after_click(&self) -> Duration {
        Duration::from_millis(self.settle_after_click_ms)
    }

    pub fn settle_after_back(&self) -> Duration {
        Duration::from_millis(self.settle_after_back_ms)
    }

    pub fn start_page_settle(&self) -> Duration {
        Duration::from_millis(self.start_page_settle_ms)
    }

    pub fn scroll_into_view(&self) -> Duration {
        Duration::from_millis(self.scroll_into_view_ms)
    }

    pub fn element_wait(&self) -> Duration {
        Duration::from_secs(self.element_wait_secs)
    }

    pub fn list_wait(&self) -> Duration {
        Duration::from_secs(self.list_wait_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
