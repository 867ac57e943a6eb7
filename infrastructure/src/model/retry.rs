//! Bounded exponential backoff for model calls.

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use std::time::Duration;

/// Backoff schedule: `initial`, doubling, capped at `max_delay`, at most
/// `max_retries` retries after the first attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub initial: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            max_retries: 5,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Delay before retry number `attempt` (0-based), or `None` when the
    /// budget is spent. A server-provided hint replaces the schedule but is
    /// still capped.
    pub fn delay(&self, attempt: u32, hint: Option<Duration>) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let scheduled = self
            .initial
            .checked_mul(2u32.saturating_pow(attempt))
            .unwrap_or(self.max_delay);
        Some(hint.unwrap_or(scheduled).min(self.max_delay))
    }
}

/// Statuses worth retrying: throttling and server errors.
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// `retry-after-ms`, falling back to `retry-after` in whole seconds.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite() && *v >= 0.0)
    };
    header("retry-after-ms")
        .map(|ms| Duration::from_secs_f64(ms / 1000.0))
        .or_else(|| header("retry-after").map(Duration::from_secs_f64))
}
