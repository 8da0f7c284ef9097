//! Courtesy pacing and bounded retries
//!
//! Every deliberate pause in the crawler goes through [`Jitter`], and every
//! retried operation is bounded by a [`RetryPolicy`]. Neither affects
//! correctness; a jitter scale of zero turns all pauses off.

use rand::{rng, Rng};
use std::time::Duration;
use tokio::time::sleep;
use tracing::trace;

/// Floor applied to every randomized delay (seconds)
const MIN_DELAY_SECS: f64 = 0.2;

/// Randomized delay source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    scale: f64,
}

impl Jitter {
    /// Creates a jitter source; negative scales are treated as zero
    pub fn new(scale: f64) -> Self {
        Self {
            scale: if scale.is_finite() { scale.max(0.0) } else { 0.0 },
        }
    }

    /// A jitter source that never sleeps
    pub fn disabled() -> Self {
        Self::new(0.0)
    }

    pub fn is_disabled(&self) -> bool {
        self.scale == 0.0
    }

    /// Draws a delay uniformly from `base ± spread` seconds
    ///
    /// The draw is floored at 0.2 s before scaling.
    pub fn delay(&self, base: f64, spread: f64) -> Duration {
        if self.is_disabled() {
            return Duration::ZERO;
        }

        let spread = spread.abs();
        let secs = if spread > 0.0 {
            rng().random_range((base - spread)..=(base + spread))
        } else {
            base
        };

        Duration::from_secs_f64(secs.max(MIN_DELAY_SECS) * self.scale)
    }

    /// Sleeps for a freshly drawn delay
    pub async fn sleep(&self, base: f64, spread: f64) {
        let delay = self.delay(base, spread);
        if delay.is_zero() {
            return;
        }
        trace!("Jitter sleep {:?}", delay);
        sleep(delay).await;
    }

    /// Sleeps for a fixed duration, still honouring the scale
    pub async fn pause(&self, duration: Duration) {
        if self.is_disabled() || duration.is_zero() {
            return;
        }
        sleep(duration.mul_f64(self.scale)).await;
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// Bounded retry policy with linearly growing, randomized backoff
///
/// The pause after failed attempt `n` (zero-based) is drawn from
/// `base * (n + 1) ± spread`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: f64,
    pub spread: f64,
    pub jitter: Jitter,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: f64, spread: f64, jitter: Jitter) -> Self {
        Self {
            max_attempts,
            base,
            spread,
            jitter,
        }
    }

    /// Policy of the lightweight detail fetcher
    pub fn lightweight(max_attempts: u32, jitter: Jitter) -> Self {
        Self::new(max_attempts, 1.0, 0.8, jitter)
    }

    /// Policy of the rendering detail fetcher
    pub fn rendering(max_attempts: u32, jitter: Jitter) -> Self {
        Self::new(max_attempts, 1.0, 0.8, jitter)
    }

    /// Policy of the next-page control
    pub fn pagination(max_attempts: u32, jitter: Jitter) -> Self {
        Self::new(max_attempts, 0.8, 0.6, jitter)
    }

    /// Zero-based attempt numbers
    pub fn attempts(&self) -> std::ops::Range<u32> {
        0..self.max_attempts
    }

    /// Whether another attempt follows `attempt`
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }

    /// Centre of the backoff window after `attempt`
    pub fn backoff_base(&self, attempt: u32) -> f64 {
        self.base * f64::from(attempt + 1)
    }

    /// Sleeps the backoff that follows a failed `attempt`
    pub async fn backoff(&self, attempt: u32) {
        self.jitter
            .sleep(self.backoff_base(attempt), self.spread)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_jitter_is_zero() {
        let jitter = Jitter::disabled();
        assert!(jitter.is_disabled());
        assert_eq!(jitter.delay(5.0, 2.0), Duration::ZERO);
        assert!(Jitter::new(-1.0).is_disabled());
        assert!(Jitter::new(f64::NAN).is_disabled());
    }

    #[test]
    fn test_delay_stays_in_window() {
        let jitter = Jitter::new(1.0);
        for _ in 0..200 {
            let secs = jitter.delay(1.2, 0.8).as_secs_f64();
            assert!((0.4..=2.0 + 1e-9).contains(&secs), "{secs}");
        }
    }

    #[test]
    fn test_delay_has_floor() {
        let jitter = Jitter::new(1.0);
        for _ in 0..100 {
            let secs = jitter.delay(0.1, 0.5).as_secs_f64();
            assert!(secs >= MIN_DELAY_SECS - 1e-9, "{secs}");
        }
    }

    #[test]
    fn test_scale_multiplies_delay() {
        let secs = Jitter::new(0.5).delay(2.0, 0.0).as_secs_f64();
        assert!((secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let policy = RetryPolicy::pagination(3, Jitter::disabled());
        assert_eq!(policy.attempts().count(), 3);
        assert!((policy.backoff_base(0) - 0.8).abs() < 1e-9);
        assert!((policy.backoff_base(2) - 2.4).abs() < 1e-9);
        assert!(policy.has_next(1));
        assert!(!policy.has_next(2));
    }

    #[tokio::test]
    async fn test_disabled_backoff_returns_immediately() {
        let policy = RetryPolicy::lightweight(4, Jitter::disabled());
        let started = std::time::Instant::now();
        for attempt in policy.attempts() {
            policy.backoff(attempt).await;
        }
        assert!(started.elapsed() < Duration::from_millis(50));
    }
}
