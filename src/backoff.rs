// Copyright (c) 2026 The sessionwatch authors
// SPDX-License-Identifier: MIT

//! Reconnection backoff policy.

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with a cap and bounded random jitter.
///
/// The jitter spreads retries from many managed connections so they do not
/// hammer a recovering server in lockstep.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    jitter: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            jitter: 0.1,
        }
    }
}

impl BackoffPolicy {
    /// Create a policy with the given base delay, cap, and jitter fraction.
    ///
    /// `jitter` is clamped to `[0, 1]`; `0` disables jitter entirely.
    pub fn new(base: Duration, cap: Duration, jitter: f64) -> Self {
        Self {
            base,
            cap,
            jitter: jitter.clamp(0.0, 1.0),
        }
    }

    /// Policy without jitter, useful where determinism matters.
    pub fn without_jitter(base: Duration, cap: Duration) -> Self {
        Self::new(base, cap, 0.0)
    }

    /// The longest delay this policy can produce.
    pub fn max_delay(&self) -> Duration {
        self.cap.mul_f64(1.0 + self.jitter)
    }

    /// Delay before the retry following `attempt` consecutive failures
    /// (`attempt = 0` for the first retry).
    ///
    /// Computes `min(base * 2^attempt, cap)`, then scales by a random factor
    /// in `[1 - jitter, 1 + jitter]`.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        // Exponent clamp keeps the doubling from overflowing; 2^32 seconds is
        // past any sane cap anyway.
        let exp = attempt.min(32);
        let raw = self
            .base
            .saturating_mul(2u32.saturating_pow(exp))
            .min(self.cap);

        if self.jitter == 0.0 {
            return raw;
        }
        let factor = 1.0 + self.jitter * rand::thread_rng().gen_range(-1.0..=1.0);
        raw.mul_f64(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_doubles_from_base() {
        let policy = BackoffPolicy::without_jitter(Duration::from_secs(1), Duration::from_secs(60));
        assert_eq!(policy.next_delay(0), Duration::from_secs(1));
        assert_eq!(policy.next_delay(1), Duration::from_secs(2));
        assert_eq!(policy.next_delay(2), Duration::from_secs(4));
        assert_eq!(policy.next_delay(5), Duration::from_secs(32));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = BackoffPolicy::without_jitter(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.next_delay(10), Duration::from_secs(30));
        assert_eq!(policy.next_delay(1000), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 0.5);
        for attempt in 0..8 {
            let raw = Duration::from_secs(1 << attempt).min(Duration::from_secs(30));
            for _ in 0..100 {
                let delay = policy.next_delay(attempt);
                assert!(delay >= raw.mul_f64(0.5), "{delay:?} under bound for {attempt}");
                assert!(delay <= raw.mul_f64(1.5), "{delay:?} over bound for {attempt}");
            }
        }
    }

    #[test]
    fn test_jitter_fraction_is_clamped() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(2), 7.5);
        // Factor can never go negative, so the delay stays non-negative and
        // below 2x the cap.
        for _ in 0..100 {
            let delay = policy.next_delay(3);
            assert!(delay <= Duration::from_secs(4));
        }
    }

    #[test]
    fn test_max_delay_covers_jitter() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(30), 0.2);
        assert!(policy.max_delay() >= Duration::from_secs(30));
        for _ in 0..100 {
            assert!(policy.next_delay(20) <= policy.max_delay());
        }
    }
}
