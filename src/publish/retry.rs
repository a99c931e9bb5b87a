//! Retry with exponential backoff around a publish attempt.
//!
//! The publish core makes exactly one attempt. Resilience is opt-in: wrap
//! the attempt in [`retry_with_backoff`] with a [`RetryPolicy`] allowing
//! retries. Only transport failures are retried.

use super::PublishError;
use std::future::Future;
use tokio::time::{Duration, Instant};

/// Default absolute deadline for a retried operation (30 minutes)
const DEFAULT_ABSOLUTE_TIMEOUT: Duration = Duration::from_secs(1800);

/// Bounded retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retry attempts (0 = try once, no retries)
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Deadline for the whole operation including retries
    pub absolute_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl RetryPolicy {
    /// One attempt, no retries.
    pub fn single_attempt() -> Self {
        Self::with_retries(0)
    }

    /// Up to `max_retries` retries with 1s, 2s, 4s, ... backoff capped at 60s.
    pub fn with_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            absolute_timeout: DEFAULT_ABSOLUTE_TIMEOUT,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy is exhausted.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    policy: &RetryPolicy,
    operation_name: &str,
) -> Result<T, PublishError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PublishError>>,
{
    let deadline = Instant::now() + policy.absolute_timeout;
    let mut retries = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retries > 0 {
                    log::info!("{operation_name} succeeded after {retries} retry(ies)");
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                if retries >= policy.max_retries {
                    if policy.max_retries > 0 {
                        log::error!("{operation_name} failed after {} attempt(s)", retries + 1);
                    }
                    return Err(e);
                }

                retries += 1;
                let remaining = deadline.saturating_duration_since(Instant::now());
                let wait = policy.backoff(retries).min(remaining);
                if remaining.is_zero() {
                    log::error!("{operation_name} reached its deadline before retry {retries}");
                    return Err(e);
                }

                log::warn!(
                    "{operation_name} failed (attempt {}/{}): {e}; retrying in {:.1}s",
                    retries,
                    policy.max_retries + 1,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
        }
    }
}
