//! Retry policy
//!
//! Stateless decision functions for the task's retry loop: whether a status
//! code or fault is retryable, whether attempts remain, and how long to back
//! off. The policy holds configuration only; the task owns the attempt
//! counter and performs the sleep so cancellation stays centralized.

use crate::config::RetryConfig;
use crate::error::HttpSinkError;
use tracing::debug;

/// Exponential backoff retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay_ms: u64,
    max_delay_ms: u64,
    multiplier: f64,
    retryable_status_codes: Vec<u16>,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        debug!(
            max_attempts = config.max_attempts,
            initial_delay_ms = config.backoff_initial_ms,
            max_delay_ms = config.backoff_max_ms,
            multiplier = config.backoff_multiplier,
            status_codes = ?config.retry_on_status_codes,
            "Retry policy initialized"
        );
        Self {
            max_attempts: config.max_attempts,
            initial_delay_ms: config.backoff_initial_ms,
            max_delay_ms: config.backoff_max_ms,
            multiplier: config.backoff_multiplier,
            retryable_status_codes: config.retry_on_status_codes.clone(),
        }
    }

    /// A status retries only when it is in the configured set.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retryable_status_codes.contains(&status)
    }

    /// A fault retries only when the transport layer marked it retryable.
    /// Auth and conversion faults never retry.
    pub fn should_retry_error(&self, error: &HttpSinkError) -> bool {
        error.is_retryable()
    }

    /// `attempt_index` is 0-based; a total of `max_attempts` attempts are
    /// allowed including the first.
    pub fn has_more_attempts(&self, attempt_index: u32) -> bool {
        self.max_attempts > 0 && attempt_index < self.max_attempts - 1
    }

    /// Delay before attempt `attempt_index + 1`:
    /// `min(max, initial * multiplier^attempt_index)`.
    pub fn delay_ms(&self, attempt_index: u32) -> u64 {
        let delay = self.initial_delay_ms as f64 * self.multiplier.powi(attempt_index as i32);
        (delay as u64).min(self.max_delay_ms)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
