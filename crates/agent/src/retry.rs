//! Retry policy for transient provider failures.
//!
//! Only errors the provider marks transient (rate limits, timeouts, network
//! failures, 5xx responses, interrupted streams) are retried, with clamped
//! exponential backoff. Everything else fails the run immediately.

use atelier_config::RetryConfig;
use atelier_core::error::ProviderError;
use std::time::Duration;

/// Decides whether and when a failed provider call is retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Maximum number of retries after the initial attempt.
    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    /// Whether `attempt` (1-based retry count) should happen for this error.
    pub fn should_retry(&self, error: &ProviderError, attempt: u32) -> bool {
        attempt <= self.config.max_retries && error.is_transient()
    }

    /// Backoff before the given 1-based retry attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let delay = self.config.base_delay_ms as f64 * self.config.multiplier.powi(exp as i32);
        Duration::from_millis(delay.min(self.config.max_delay_ms as f64) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            multiplier: 2.0,
        })
    }

    #[test]
    fn transient_errors_retry_within_budget() {
        let p = policy();
        let err = ProviderError::RateLimited { retry_after_secs: 5 };
        assert!(p.should_retry(&err, 1));
        assert!(p.should_retry(&err, 3));
        assert!(!p.should_retry(&err, 4));
    }

    #[test]
    fn permanent_errors_never_retry() {
        let p = policy();
        assert!(!p.should_retry(&ProviderError::AuthenticationFailed("bad key".into()), 1));
        assert!(!p.should_retry(&ProviderError::InvalidRequest("bad schema".into()), 1));
    }

    #[test]
    fn server_errors_retry_client_errors_do_not() {
        let p = policy();
        assert!(p.should_retry(
            &ProviderError::ApiError {
                status_code: 503,
                message: "overloaded".into()
            },
            1
        ));
        assert!(!p.should_retry(
            &ProviderError::ApiError {
                status_code: 422,
                message: "bad request".into()
            },
            1
        ));
    }

    #[test]
    fn backoff_grows_and_clamps() {
        let p = policy();
        assert_eq!(p.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(p.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(p.delay_for_attempt(3), Duration::from_millis(4000));
        // 2^9 * 1000 = 512000, clamped
        assert_eq!(p.delay_for_attempt(10), Duration::from_millis(30000));
    }
}
