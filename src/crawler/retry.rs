//! Bounded retries with exponential backoff
//!
//! Every fetch in the pipeline goes through [`RetryPolicy::run`], which is
//! the only place that decides whether a failure is worth another attempt.

use crate::config::FetchConfig;
use crate::ScrapeError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Retry schedule for one kind of request
///
/// | Attempt failed | Wait before next attempt |
/// |----------------|--------------------------|
/// | 1 | `base_delay` |
/// | 2 | `base_delay * 2` |
/// | n | `base_delay * 2^(n-1)`, capped at `max_delay` |
///
/// A `RateLimited` failure waits at least the server's `Retry-After`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` counts the first attempt and is at least 1
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Computes the wait after failed attempt number `attempt` (1-based)
    ///
    /// # Examples
    ///
    /// ```
    /// use bienici_scraper::crawler::RetryPolicy;
    /// use bienici_scraper::ScrapeError;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::new(5, Duration::from_secs(5), Duration::from_secs(30));
    /// let err = ScrapeError::Network { url: "u".into(), message: "timeout".into() };
    ///
    /// assert_eq!(policy.delay_for(1, &err), Duration::from_secs(5));
    /// assert_eq!(policy.delay_for(2, &err), Duration::from_secs(10));
    /// assert_eq!(policy.delay_for(4, &err), Duration::from_secs(30));
    /// ```
    pub fn delay_for(&self, attempt: u32, error: &ScrapeError) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);

        let wait = match error {
            ScrapeError::RateLimited {
                retry_after: Some(retry_after),
                ..
            } => backoff.max(*retry_after),
            _ => backoff,
        };

        wait.min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently or runs out of attempts
    ///
    /// # Arguments
    ///
    /// * `label` - Short description used in log lines (usually the URL)
    /// * `cancel` - Stops the loop before the next attempt or during a wait
    /// * `op` - Produces one attempt per call
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - An attempt succeeded
    /// * `Err(e)` - A permanent error from the first attempt that hit it, untagged
    /// * `Err(ScrapeError::RetriesExhausted)` - Every attempt failed transiently
    /// * `Err(ScrapeError::Cancelled)` - Cancelled before an attempt could start
    pub async fn run<T, F, Fut>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, ScrapeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ScrapeError>>,
    {
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ScrapeError::Cancelled);
            }

            attempt += 1;

            let err = match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!("{} succeeded on attempt {}", label, attempt);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt >= self.max_attempts {
                tracing::warn!("{} failed after {} attempts: {}", label, attempt, err);
                return Err(ScrapeError::RetriesExhausted {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            let delay = self.delay_for(attempt, &err);
            tracing::warn!(
                "{} failed (attempt {}/{}): {}; retrying in {:?}",
                label,
                attempt,
                self.max_attempts,
                err,
                delay
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(ScrapeError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
