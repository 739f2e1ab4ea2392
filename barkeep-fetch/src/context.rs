//! Crawl context bundling the politeness machinery.
//!
//! Every remote call goes through [`CrawlContext::call`], which composes the
//! pieces in a fixed order for each attempt:
//!
//! ```text
//! breaker.allow() -> pacer.wait_for_slot() -> request -> breaker.record_result()
//!        ^                                                     |
//!        +------------- retry backoff (transient only) --------+
//! ```
//!
//! The slot wait and the backoff both observe a [`CancelToken`]; a cancelled
//! crawl sends nothing further.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::agents::UserAgentPool;
use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::cancel::CancelToken;
use crate::error::{AttemptError, CrawlError};
use crate::pacer::{Pacer, PacerConfig};
use crate::retry::RetryPolicy;

// ============================================================================
// Crawl Config
// ============================================================================

/// Politeness settings for a crawl.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlConfig {
    /// Pacing and blackout window.
    pub pacer: PacerConfig,
    /// Circuit breaker thresholds.
    pub breaker: CircuitBreakerConfig,
    /// Retry policy.
    pub retry: RetryPolicy,
    /// Whether to rotate user agents.
    pub rotate_user_agents: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            pacer: PacerConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            retry: RetryPolicy::default(),
            rotate_user_agents: true,
            timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Crawl Context
// ============================================================================

/// Shared pacing, circuit breaking and retry for one process.
///
/// Clone the `Arc`s, not the context: there must be exactly one pacer and
/// one breaker per remote source.
pub struct CrawlContext {
    /// Request pacer.
    pub pacer: Arc<Pacer>,
    /// Circuit breaker for the remote source.
    pub breaker: Arc<CircuitBreaker>,
    /// Retry policy.
    pub retry: RetryPolicy,
    /// User agents.
    pub agents: Arc<UserAgentPool>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl CrawlContext {
    /// Creates a context from a config.
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            pacer: Arc::new(Pacer::new(config.pacer)),
            breaker: Arc::new(CircuitBreaker::new(config.breaker)),
            retry: config.retry,
            agents: Arc::new(UserAgentPool::with_defaults(config.rotate_user_agents)),
            timeout: config.timeout,
        }
    }

    /// Creates a builder for customizing the context.
    pub fn builder() -> CrawlContextBuilder {
        CrawlContextBuilder::new()
    }

    /// Runs one logical remote operation under pacer, breaker and retry.
    ///
    /// A pacer slot is held for the whole of each attempt.
    ///
    /// # Errors
    ///
    /// See [`RetryPolicy::execute`].
    pub async fn call<T, F, Fut>(&self, operation: F) -> Result<T, CrawlError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        self.call_until_cancelled(&CancelToken::never(), operation)
            .await
    }

    /// Like [`call`](Self::call), but gives up as soon as `cancel` fires
    /// while waiting for a pacer slot or backing off.
    ///
    /// A request is only sent if the crawl is still live once the slot is
    /// granted.
    ///
    /// # Errors
    ///
    /// See [`RetryPolicy::execute_until_cancelled`].
    pub async fn call_until_cancelled<T, F, Fut>(
        &self,
        cancel: &CancelToken,
        mut operation: F,
    ) -> Result<T, CrawlError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let pacer = &self.pacer;
        self.retry
            .execute_until_cancelled(&self.breaker, cancel, |_| {
                let attempt = operation();
                let cancel = cancel.clone();
                async move {
                    let _slot = tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            return Err(AttemptError::cancelled("waiting for a request slot"));
                        }
                        slot = pacer.wait_for_slot() => slot,
                    };
                    if cancel.is_cancelled() {
                        return Err(AttemptError::cancelled("request slot granted"));
                    }
                    attempt.await
                }
            })
            .await
    }
}

impl Default for CrawlContext {
    fn default() -> Self {
        Self::new(CrawlConfig::default())
    }
}

impl std::fmt::Debug for CrawlContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlContext")
            .field("pacer", &self.pacer)
            .field("breaker_state", &self.breaker.state())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Crawl Context Builder
// ============================================================================

/// Builder for constructing a `CrawlContext`.
pub struct CrawlContextBuilder {
    pacer: Option<Arc<Pacer>>,
    breaker: Option<Arc<CircuitBreaker>>,
    agents: Option<Arc<UserAgentPool>>,
    config: CrawlConfig,
}

impl CrawlContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            pacer: None,
            breaker: None,
            agents: None,
            config: CrawlConfig::default(),
        }
    }

    /// Sets the base config.
    #[must_use]
    pub fn config(mut self, config: CrawlConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the pacer.
    #[must_use]
    pub fn pacer(mut self, pacer: Arc<Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    /// Sets the circuit breaker.
    #[must_use]
    pub fn breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Sets the user-agent pool.
    #[must_use]
    pub fn agents(mut self, agents: Arc<UserAgentPool>) -> Self {
        self.agents = Some(agents);
        self
    }

    /// Builds the context.
    pub fn build(self) -> CrawlContext {
        let config = self.config;
        CrawlContext {
            pacer: self
                .pacer
                .unwrap_or_else(|| Arc::new(Pacer::new(config.pacer))),
            breaker: self
                .breaker
                .unwrap_or_else(|| Arc::new(CircuitBreaker::new(config.breaker))),
            retry: config.retry,
            agents: self.agents.unwrap_or_else(|| {
                Arc::new(UserAgentPool::with_defaults(config.rotate_user_agents))
            }),
            timeout: config.timeout,
        }
    }
}

impl Default for CrawlContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::breaker::CircuitState;
    use crate::pacer::BlackoutWindow;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fast context for tests: 1s fixed pacing, no blackout.
    pub(crate) fn test_context() -> CrawlContext {
        CrawlContext::builder()
            .config(CrawlConfig {
                pacer: PacerConfig::new(Duration::from_secs(1), Duration::from_secs(1))
                    .with_blackout(BlackoutWindow::new(0, 0)),
                ..CrawlConfig::default()
            })
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_takes_a_slot() {
        let ctx = test_context();
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = ctx
            .call(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(AttemptError::transient("reset"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        // 1s slot, 1s backoff, then the slot gap is already satisfied
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_skips_pacer() {
        let ctx = test_context();
        for _ in 0..5 {
            ctx.breaker.record_result(false);
        }
        assert_eq!(ctx.breaker.state(), CircuitState::Open);

        let start = tokio::time::Instant::now();
        let result: Result<(), _> = ctx.call(|| async { Ok(()) }).await;
        assert!(matches!(result, Err(CrawlError::CircuitOpen { attempts: 0 })));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_waiting_for_slot_sends_nothing() {
        let ctx = test_context();
        let handle = crate::cancel::CancelHandle::new();
        let token = handle.token();
        let sent = AtomicU32::new(0);

        // the second call waits out the 1s gap after the first
        let first: Result<(), _> = ctx.call_until_cancelled(&token, || async { Ok(()) }).await;
        assert!(first.is_ok());

        let start = tokio::time::Instant::now();
        let cancel_soon = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        };
        let second = ctx.call_until_cancelled(&token, || {
            let sent = &sent;
            async move {
                sent.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let (result, ()) = tokio::join!(second, cancel_soon);

        assert!(matches!(result, Err(CrawlError::Cancelled)));
        assert_eq!(sent.load(Ordering::SeqCst), 0);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
        assert_eq!(ctx.breaker.failures_in_window(), 0);
    }
}
