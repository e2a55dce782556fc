use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a monitoring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Delay between full passes in continuous mode (default: 30s).
    pub pass_delay: Duration,
    /// HTTP request timeout for probe fetches.
    pub request_timeout: Duration,
    /// Maximum number of retries for failed probe fetches.
    pub max_retries: u32,
    /// Base backoff duration for retries (doubled each attempt).
    pub retry_backoff: Duration,
    /// Maximum number of events to retain (ring buffer capacity).
    pub event_limit: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            pass_delay: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
            event_limit: 200,
        }
    }
}

impl MonitorConfig {
    pub fn with_pass_delay(mut self, ms: u64) -> Self {
        self.pass_delay = Duration::from_millis(ms);
        self
    }

    pub fn with_request_timeout(mut self, ms: u64) -> Self {
        self.request_timeout = Duration::from_millis(ms);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, ms: u64) -> Self {
        self.retry_backoff = Duration::from_millis(ms);
        self
    }

    pub fn with_event_limit(mut self, limit: usize) -> Self {
        self.event_limit = limit;
        self
    }
}
