//! Retry policy for Slack Web API calls.
//!
//! Listeners route their channel one payload at a time, so every wait here
//! stalls the whole channel. A server `Retry-After` hint is honored only up to
//! `max_delay`; a longer hint ends the retry loop instead of parking the
//! listener.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub(crate) fn new(max_attempts: usize, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        let base_delay = Duration::from_millis(base_delay_ms.max(1));
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: Duration::from_millis(max_delay_ms).max(base_delay),
        }
    }

    /// Delay before retrying a call that got `status` on attempt `attempt`
    /// (counted from 1), or `None` to give up.
    pub(crate) fn after_status(
        &self,
        attempt: usize,
        status: StatusCode,
        headers: &HeaderMap,
    ) -> Option<Duration> {
        if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
            return None;
        }
        self.next_delay(attempt, retry_after_hint(headers))
    }

    /// Only failures that never reached Slack are retried; anything after the
    /// request went out may already have taken effect.
    pub(crate) fn after_transport_error(
        &self,
        attempt: usize,
        error: &reqwest::Error,
    ) -> Option<Duration> {
        if !(error.is_connect() || error.is_timeout()) {
            return None;
        }
        self.next_delay(attempt, None)
    }

    fn next_delay(&self, attempt: usize, hint: Option<Duration>) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        match hint {
            Some(hint) if hint > self.max_delay => None,
            Some(hint) => Some(hint),
            None => Some(self.backoff(attempt)),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }
}

fn retry_after_hint(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
