//! Request pacing.
//!
//! The [`Pacer`] is the single choke point for outbound request cadence. A
//! caller obtains a [`PacerSlot`] before every network call and holds it
//! until the call completes. Only one slot exists at a time, so at most one
//! request is ever in flight.
//!
//! Before a slot is granted the pacer:
//! 1. sleeps out any blackout window (local wall-clock hours),
//! 2. samples a delay uniformly from `[min_delay, max_delay]`,
//! 3. waits until that delay has passed since the previous slot was released.
//!
//! After a blackout the sampled delay is always applied in full.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, info};

// ============================================================================
// Clock
// ============================================================================

/// Source of local wall-clock time, used for blackout windows.
pub trait Clock: Send + Sync {
    /// Returns the current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

// ============================================================================
// Blackout Window
// ============================================================================

/// Hours of the day during which no request may be dispatched.
///
/// The window is `[start_hour, end_hour)` and may wrap past midnight
/// (`22..6`). Equal hours disable the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlackoutWindow {
    start_hour: u32,
    end_hour: u32,
}

impl BlackoutWindow {
    /// Creates a window. Hours are taken modulo 24.
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour: start_hour % 24,
            end_hour: end_hour % 24,
        }
    }

    /// Start hour (inclusive).
    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    /// End hour (exclusive).
    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Returns true if the window never applies.
    pub fn is_disabled(&self) -> bool {
        self.start_hour == self.end_hour
    }

    /// Returns true if `hour` falls inside the window.
    pub fn contains_hour(&self, hour: u32) -> bool {
        if self.is_disabled() {
            false
        } else if self.start_hour < self.end_hour {
            (self.start_hour..self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    /// Returns how long until the window ends, or `None` if `now` is outside it.
    pub fn remaining(&self, now: NaiveDateTime) -> Option<Duration> {
        if !self.contains_hour(now.hour()) {
            return None;
        }
        let end_time = NaiveTime::from_hms_opt(self.end_hour, 0, 0)?;
        let mut end = now.date().and_time(end_time);
        if end <= now {
            end += chrono::Duration::days(1);
        }
        (end - now).to_std().ok()
    }
}

// ============================================================================
// Pacer Config
// ============================================================================

/// Configuration for the [`Pacer`].
#[derive(Debug, Clone, PartialEq)]
pub struct PacerConfig {
    /// Lower bound of the randomized delay.
    pub min_delay: Duration,
    /// Upper bound of the randomized delay.
    pub max_delay: Duration,
    /// Optional blackout window.
    pub blackout: Option<BlackoutWindow>,
}

impl PacerConfig {
    /// Creates a config. Swaps the bounds if `min > max`.
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        let (min_delay, max_delay) = if min_delay <= max_delay {
            (min_delay, max_delay)
        } else {
            (max_delay, min_delay)
        };
        Self {
            min_delay,
            max_delay,
            blackout: None,
        }
    }

    /// Sets the blackout window.
    #[must_use]
    pub fn with_blackout(mut self, window: BlackoutWindow) -> Self {
        self.blackout = (!window.is_disabled()).then_some(window);
        self
    }
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5))
            .with_blackout(BlackoutWindow::new(17, 20))
    }
}

// ============================================================================
// Pacer
// ============================================================================

#[derive(Debug, Default)]
struct Gate {
    last_release: Option<Instant>,
}

/// Permission to perform exactly one network call.
///
/// Dropping the slot records the release time that the next delay is
/// measured from.
#[derive(Debug)]
pub struct PacerSlot {
    gate: OwnedMutexGuard<Gate>,
    sampled_delay: Duration,
    waited: Duration,
}

impl PacerSlot {
    /// The randomized delay chosen for this slot.
    pub fn sampled_delay(&self) -> Duration {
        self.sampled_delay
    }

    /// Total time the caller waited, including blackout and queueing.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

impl Drop for PacerSlot {
    fn drop(&mut self) {
        self.gate.last_release = Some(Instant::now());
    }
}

/// Serializing, randomized request pacer.
pub struct Pacer {
    config: PacerConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    gate: Arc<AsyncMutex<Gate>>,
}

impl Pacer {
    /// Creates a pacer using the system clock.
    pub fn new(config: PacerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a pacer with a custom clock.
    pub fn with_clock(config: PacerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            rng: Mutex::new(StdRng::from_entropy()),
            gate: Arc::new(AsyncMutex::new(Gate::default())),
        }
    }

    /// Uses a deterministic random source.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Samples a delay from `[min_delay, max_delay]`.
    pub fn sample_delay(&self) -> Duration {
        let min = self.config.min_delay.as_secs_f64();
        let max = self.config.max_delay.as_secs_f64();
        let secs = {
            let mut rng = self
                .rng
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            rng.gen_range(min..=max)
        };
        Duration::from_secs_f64(secs).clamp(self.config.min_delay, self.config.max_delay)
    }

    /// Waits until a request may be dispatched.
    ///
    /// The returned slot must be held for the duration of the request.
    pub async fn wait_for_slot(&self) -> PacerSlot {
        let started = Instant::now();
        let gate = Arc::clone(&self.gate).lock_owned().await;

        let mut after_blackout = false;
        let sampled = loop {
            if let Some(remaining) = self.blackout_remaining() {
                info!(
                    wait_secs = remaining.as_secs(),
                    "Inside blackout window, pausing requests"
                );
                tokio::time::sleep(remaining).await;
                after_blackout = true;
                continue;
            }

            let sampled = self.sample_delay();
            let since_release = gate.last_release.map(|t| t.elapsed());
            let wait = match since_release {
                Some(elapsed) if !after_blackout => sampled.saturating_sub(elapsed),
                _ => sampled,
            };
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }

            // the delay may have carried us into the window
            if self.blackout_remaining().is_none() {
                break sampled;
            }
            after_blackout = true;
        };

        let waited = started.elapsed();
        debug!(
            sampled_ms = sampled.as_millis(),
            waited_ms = waited.as_millis(),
            "Pacer slot granted"
        );
        PacerSlot {
            gate,
            sampled_delay: sampled,
            waited,
        }
    }

    fn blackout_remaining(&self) -> Option<Duration> {
        self.config
            .blackout
            .and_then(|window| window.remaining(self.clock.now()))
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(PacerConfig::default())
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Local time that advances with tokio's (possibly paused) clock.
    struct TokioClock {
        base: NaiveDateTime,
        origin: Instant,
    }

    impl TokioClock {
        fn at(hour: u32, minute: u32) -> Arc<Self> {
            let base = NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(hour, minute, 0)
                .unwrap();
            Arc::new(Self {
                base,
                origin: Instant::now(),
            })
        }
    }

    impl Clock for TokioClock {
        fn now(&self) -> NaiveDateTime {
            self.base + chrono::Duration::from_std(self.origin.elapsed()).unwrap()
        }
    }

    fn config(min: u64, max: u64) -> PacerConfig {
        PacerConfig::new(Duration::from_secs(min), Duration::from_secs(max))
    }

    #[test]
    fn test_window_contains() {
        let window = BlackoutWindow::new(17, 20);
        assert!(!window.contains_hour(16));
        assert!(window.contains_hour(17));
        assert!(window.contains_hour(19));
        assert!(!window.contains_hour(20));
    }

    #[test]
    fn test_window_wraps_midnight() {
        let window = BlackoutWindow::new(22, 6);
        assert!(window.contains_hour(23));
        assert!(window.contains_hour(0));
        assert!(window.contains_hour(5));
        assert!(!window.contains_hour(6));
        assert!(!window.contains_hour(12));
    }

    #[test]
    fn test_equal_hours_disable_window() {
        let window = BlackoutWindow::new(9, 9);
        assert!(window.is_disabled());
        assert!((0..24).all(|h| !window.contains_hour(h)));
        assert!(config(1, 2).with_blackout(window).blackout.is_none());
    }

    #[test]
    fn test_remaining_until_window_end() {
        let window = BlackoutWindow::new(22, 6);
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        assert_eq!(
            window.remaining(now),
            Some(Duration::from_secs(6 * 3600 + 30 * 60))
        );
    }

    #[test]
    fn test_swapped_bounds() {
        let cfg = config(5, 2);
        assert_eq!(cfg.min_delay, Duration::from_secs(2));
        assert_eq!(cfg.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_sampled_delay_within_bounds() {
        for (min, max) in [(0, 0), (1, 1), (2, 5), (0, 30)] {
            let pacer = Pacer::new(config(min, max)).with_seed(7);
            for _ in 0..500 {
                let delay = pacer.sample_delay();
                assert!(delay >= Duration::from_secs(min), "{delay:?} < {min}");
                assert!(delay <= Duration::from_secs(max), "{delay:?} > {max}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_slot_waits_sampled_delay() {
        let pacer = Pacer::with_clock(config(2, 5), TokioClock::at(9, 0)).with_seed(1);
        let slot = pacer.wait_for_slot().await;
        assert!(slot.sampled_delay() >= Duration::from_secs(2));
        assert!(slot.sampled_delay() <= Duration::from_secs(5));
        // timers resolve to the next millisecond
        assert!(slot.waited() >= slot.sampled_delay());
        assert!(slot.waited() < slot.sampled_delay() + Duration::from_millis(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gap_measured_from_release() {
        let pacer = Pacer::with_clock(config(3, 3), TokioClock::at(9, 0));
        drop(pacer.wait_for_slot().await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let slot = pacer.wait_for_slot().await;
        assert_eq!(slot.waited(), Duration::ZERO);

        drop(slot);
        tokio::time::sleep(Duration::from_secs(1)).await;
        let slot = pacer.wait_for_slot().await;
        assert_eq!(slot.waited(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_slot_inside_blackout() {
        let clock = TokioClock::at(17, 30);
        let pacer = Pacer::with_clock(
            config(2, 2).with_blackout(BlackoutWindow::new(17, 20)),
            clock.clone(),
        );

        let slot = pacer.wait_for_slot().await;
        let granted_at = clock.now();
        assert!(!BlackoutWindow::new(17, 20).contains_hour(granted_at.hour()));
        // 2h30m of blackout plus the full sampled delay
        assert_eq!(slot.waited(), Duration::from_secs(2 * 3600 + 30 * 60 + 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_into_blackout_rechecks() {
        // 16:59:59 plus a 5s delay lands inside the window
        let clock = Arc::new(TokioClock {
            base: NaiveDate::from_ymd_opt(2024, 6, 1)
                .unwrap()
                .and_hms_opt(16, 59, 59)
                .unwrap(),
            origin: Instant::now(),
        });
        let pacer = Pacer::with_clock(
            config(5, 5).with_blackout(BlackoutWindow::new(17, 20)),
            clock.clone(),
        );

        let _slot = pacer.wait_for_slot().await;
        let granted_at = clock.now();
        assert_eq!(granted_at.hour(), 20);
        assert_eq!(granted_at.second(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slots_are_exclusive() {
        let pacer = Arc::new(Pacer::with_clock(config(1, 1), TokioClock::at(9, 0)));
        let first = pacer.wait_for_slot().await;

        let contender = {
            let pacer = Arc::clone(&pacer);
            tokio::spawn(async move { pacer.wait_for_slot().await.waited() })
        };

        // well past the delay, but the first slot is still held
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!contender.is_finished());

        drop(first);
        let waited = contender.await.unwrap();
        assert!(waited >= Duration::from_secs(31));
    }
}
