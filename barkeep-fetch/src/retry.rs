//! Retry policy for remote operations.
//!
//! One logical operation (e.g. "fetch page N of category X") is attempted up
//! to `1 + max_retries` times. Only transient failures are retried. The
//! circuit breaker is consulted before every attempt and told the outcome of
//! every dispatched attempt exactly once.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::breaker::CircuitBreaker;
use crate::cancel::CancelToken;
use crate::error::{AttemptError, CrawlError, FailureKind};

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy with a 1s base delay and a 60s cap.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retrying after the zero-based `attempt` failed.
    ///
    /// `base_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` under this policy.
    ///
    /// `operation` receives the zero-based attempt number.
    ///
    /// # Errors
    ///
    /// - [`CrawlError::CircuitOpen`] if the breaker rejects an attempt; no
    ///   request is made and no attempt is consumed.
    /// - [`CrawlError::PermanentRequest`] / [`CrawlError::ShapeMismatch`]
    ///   immediately on a non-transient failure.
    /// - [`CrawlError::CrawlFailed`] once transient failures exhaust the
    ///   retries.
    pub async fn execute<T, F, Fut>(
        &self,
        breaker: &CircuitBreaker,
        operation: F,
    ) -> Result<T, CrawlError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        self.execute_until_cancelled(breaker, &CancelToken::never(), operation)
            .await
    }

    /// Runs `operation` under this policy until `cancel` fires.
    ///
    /// Cancellation is checked before every attempt and cuts a backoff
    /// sleep short. An attempt that fails with [`FailureKind::Cancelled`]
    /// was never dispatched: its breaker permit is released rather than
    /// recorded.
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`CrawlError::Cancelled`].
    pub async fn execute_until_cancelled<T, F, Fut>(
        &self,
        breaker: &CircuitBreaker,
        cancel: &CancelToken,
        mut operation: F,
    ) -> Result<T, CrawlError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                debug!(attempt, "Cancelled, not dispatching");
                return Err(CrawlError::Cancelled);
            }
            if !breaker.allow() {
                debug!(attempt, "Circuit open, not dispatching");
                return Err(CrawlError::CircuitOpen { attempts: attempt });
            }

            let error = match operation(attempt).await {
                Ok(value) => {
                    breaker.record_result(true);
                    return Ok(value);
                }
                Err(error) if error.kind == FailureKind::Cancelled => {
                    breaker.release();
                    debug!(attempt, context = %error.context, "Cancelled before dispatch");
                    return Err(CrawlError::Cancelled);
                }
                Err(error) => {
                    breaker.record_result(false);
                    error
                }
            };

            match error.kind {
                FailureKind::PermanentRequest => return Err(CrawlError::PermanentRequest(error)),
                FailureKind::ShapeMismatch => return Err(CrawlError::ShapeMismatch(error)),
                FailureKind::Cancelled => return Err(CrawlError::Cancelled),
                FailureKind::TransientNetwork => {}
            }

            if attempt >= self.max_retries {
                return Err(CrawlError::CrawlFailed {
                    attempts: attempt + 1,
                    last_error: error,
                });
            }

            let delay = error
                .retry_after
                .map_or_else(
                    || self.delay_for_attempt(attempt),
                    |after| after.max(self.delay_for_attempt(attempt)),
                )
                .min(self.max_delay);
            warn!(
                error = %error,
                attempt,
                delay_ms = delay.as_millis(),
                "Transient failure, retrying"
            );
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel.cancelled() => {
                    debug!(attempt, "Cancelled during backoff");
                    return Err(CrawlError::Cancelled);
                }
            }
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
