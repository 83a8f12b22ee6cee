use std::time::Duration;

use crate::domain::models::RenewalConfig;
use crate::domain::LeaseError;

/// Bounded retry policy for transient renewal failures
///
/// Backoff doubles with each retry and is capped:
/// `min(initial_backoff * 2^attempt, max_backoff)`.
///
/// # Retry Decision
/// - Retry on: backend unavailable (transport errors, 429, 5xx) and timeouts
/// - Do NOT retry: authentication failures, not found, invalid responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries before giving up
    max_retries: u32,

    /// Initial backoff duration in milliseconds
    initial_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `max_retries` - Retries allowed after the first attempt (0 disables retrying)
    /// * `initial_backoff_ms` - Delay before the first retry
    /// * `max_backoff_ms` - Upper bound for any single delay
    ///
    /// # Example
    /// ```
    /// use leasekeeper::services::retry::RetryPolicy;
    ///
    /// let policy = RetryPolicy::new(3, 1_000, 30_000);
    /// assert_eq!(policy.max_retries(), 3);
    /// ```
    pub const fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    pub const fn from_config(config: &RenewalConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Calculate the delay before retry number `attempt` (0-indexed)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }

    /// Determine if a failed attempt should be retried
    ///
    /// `attempt` counts the retries already made for the current renewal.
    pub const fn should_retry(&self, error: &LeaseError, attempt: u32) -> bool {
        if attempt >= self.max_retries {
            return false;
        }

        error.is_retryable()
    }
}

impl Default for RetryPolicy {
    /// Create a retry policy with recommended defaults:
    /// - Max retries: 3
    /// - Initial backoff: 1 second
    /// - Max backoff: 30 seconds
    fn default() -> Self {
        Self::new(3, 1_000, 30_000)
    }
}
