//! Backoff policy for compare-and-swap retries.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How often, and how patiently, a lost compare-and-swap is retried.
///
/// `max_attempts` counts every try including the first, so `1` disables
/// retrying. Delays grow as `base_delay * 2^(attempt - 1)`, capped at
/// `max_delay`, then spread by up to `±jitter` of themselves so contending
/// writers do not retry in lockstep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CasRetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Jitter factor (0.0-1.0).
    pub jitter: f64,
}

impl Default for CasRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(2),
            max_delay: Duration::from_millis(50),
            jitter: 0.5,
        }
    }
}

impl CasRetryPolicy {
    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    /// Delay to sleep after the given failed attempt (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_us = self.base_delay.as_micros() as f64;
        let max_us = self.max_delay.as_micros() as f64;
        let exp = 2_f64.powi(attempt.saturating_sub(1).min(30) as i32);
        let delay_us = (base_us * exp).min(max_us);

        let jitter_range = delay_us * self.jitter.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_micros((delay_us + jitter).max(0.0) as u64)
    }

    /// Whether another attempt may follow attempt number `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
