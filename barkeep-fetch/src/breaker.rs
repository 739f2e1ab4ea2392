//! Circuit breaker for the remote catalog source.
//!
//! ```text
//!            failures in window >= threshold
//!   Closed ───────────────────────────────────▶ Open
//!     ▲                                          │
//!     │ trial succeeds          cool-down passes │
//!     │                                          ▼
//!     └──────────────────────────────────── HalfOpen
//!                 trial fails: back to Open, cool-down restarts
//! ```
//!
//! The window holds the outcomes of the last `window_size` calls made while
//! closed. In half-open state exactly one trial call is let through.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default number of failures that trips the breaker.
pub const DEFAULT_FAILURE_THRESHOLD: usize = 5;

/// Default number of recent calls considered.
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Default time the breaker stays open.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_secs(60);

// ============================================================================
// State
// ============================================================================

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// All calls are rejected locally.
    Open,
    /// One trial call is permitted.
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Config
// ============================================================================

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Failures within the window that open the circuit.
    pub failure_threshold: usize,
    /// Number of recent calls in the rolling window.
    pub window_size: usize,
    /// How long the circuit stays open before a trial.
    pub cool_down: Duration,
}

impl CircuitBreakerConfig {
    /// Creates a config, keeping `1 <= failure_threshold <= window_size`.
    pub fn new(failure_threshold: usize, window_size: usize, cool_down: Duration) -> Self {
        let window_size = window_size.max(1);
        Self {
            failure_threshold: failure_threshold.clamp(1, window_size),
            window_size,
            cool_down,
        }
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_FAILURE_THRESHOLD,
            DEFAULT_WINDOW_SIZE,
            DEFAULT_COOL_DOWN,
        )
    }
}

// ============================================================================
// Circuit Breaker
// ============================================================================

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Inner {
    fn failures(&self) -> usize {
        self.window.iter().filter(|ok| !**ok).count()
    }

    fn trip(&mut self) {
        self.state = CircuitState::Open;
        self.opened_at = Some(Instant::now());
        self.trial_in_flight = false;
    }
}

/// Rolling-window circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window: VecDeque::with_capacity(config.window_size),
                opened_at: None,
                trial_in_flight: false,
            }),
            config,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the current state without triggering transitions.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Returns the failures currently in the window.
    pub fn failures_in_window(&self) -> usize {
        self.lock().failures()
    }

    /// Returns true if a call may be dispatched now.
    ///
    /// Must be consulted before every attempt. A `true` in half-open state
    /// reserves the single trial call.
    pub fn allow(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .is_none_or(|at| at.elapsed() >= self.config.cool_down);
                if cooled {
                    info!("Circuit cool-down elapsed, allowing trial call");
                    inner.state = CircuitState::HalfOpen;
                    inner.trial_in_flight = true;
                }
                cooled
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    false
                } else {
                    inner.trial_in_flight = true;
                    true
                }
            }
        }
    }

    /// Records the outcome of an attempt that [`allow`](Self::allow) permitted.
    pub fn record_result(&self, success: bool) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {
                if inner.window.len() == self.config.window_size {
                    inner.window.pop_front();
                }
                inner.window.push_back(success);

                let failures = inner.failures();
                if failures >= self.config.failure_threshold {
                    warn!(
                        failures,
                        window = self.config.window_size,
                        cool_down_secs = self.config.cool_down.as_secs(),
                        "Circuit opened"
                    );
                    inner.trip();
                }
            }
            CircuitState::HalfOpen => {
                inner.trial_in_flight = false;
                if success {
                    info!("Trial call succeeded, circuit closed");
                    inner.state = CircuitState::Closed;
                    inner.window.clear();
                    inner.opened_at = None;
                } else {
                    warn!("Trial call failed, circuit reopened");
                    inner.trip();
                }
            }
            CircuitState::Open => {
                debug!(success, "Ignoring outcome recorded while open");
            }
        }
    }

    /// Gives back a call that [`allow`](Self::allow) permitted but that was
    /// never dispatched. Records no outcome.
    pub fn release(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen {
            inner.trial_in_flight = false;
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::default()
    }

    #[test]
    fn test_opens_exactly_at_threshold() {
        let breaker = breaker();
        for _ in 0..4 {
            assert!(breaker.allow());
            breaker.record_result(false);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);

        assert!(breaker.allow());
        breaker.record_result(false);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow());
    }

    #[test]
    fn test_old_failures_leave_window() {
        let breaker = breaker();
        for _ in 0..4 {
            breaker.record_result(false);
        }
        for _ in 0..10 {
            breaker.record_result(true);
        }
        assert_eq!(breaker.failures_in_window(), 0);
        breaker.record_result(false);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_interleaved_failures_in_window() {
        let breaker = breaker();
        // F S F S F S F S F: five failures among the last nine calls
        for i in 0..9 {
            assert_eq!(breaker.state(), CircuitState::Closed, "call {i}");
            breaker.record_result(i % 2 == 1);
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_failure_sequences_open_iff_threshold_reached() {
        // every 8-call outcome sequence against a 3-of-4 breaker
        for bits in 0u32..256 {
            let breaker =
                CircuitBreaker::new(CircuitBreakerConfig::new(3, 4, Duration::from_secs(60)));
            let mut window: VecDeque<bool> = VecDeque::new();
            let mut expect_open = false;
            for i in 0..8 {
                if expect_open {
                    assert!(!breaker.allow(), "dispatch while open, seq {bits:08b}");
                    break;
                }
                assert!(breaker.allow());
                let ok = bits & (1 << i) == 0;
                breaker.record_result(ok);
                if window.len() == 4 {
                    window.pop_front();
                }
                window.push_back(ok);
                expect_open = window.iter().filter(|o| !**o).count() >= 3;
                assert_eq!(
                    breaker.state() == CircuitState::Open,
                    expect_open,
                    "seq {bits:08b} at {i}"
                );
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_after_cool_down() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::new(
            1,
            10,
            Duration::from_secs(60),
        ));
        breaker.record_result(false);
        assert!(!breaker.allow());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!breaker.allow());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.allow());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        // only one trial
        assert!(!breaker.allow());

        breaker.record_result(true);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_trial_resets_cool_down() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::new(
            1,
            10,
            Duration::from_secs(60),
        ));
        breaker.record_result(false);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(breaker.allow());
        breaker.record_result(false);
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(!breaker.allow());
        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(breaker.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_returns_half_open_trial() {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig::new(1, 10, Duration::from_secs(5)));
        assert!(breaker.allow());
        breaker.record_result(false);
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(breaker.allow());
        assert!(!breaker.allow());

        breaker.release();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.allow());
        breaker.record_result(true);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
