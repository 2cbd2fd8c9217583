use rand::Rng;
use std::time::Duration;

pub const DEFAULT_BASE_MS: u64 = 500;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Exponential retry delay with symmetric jitter.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base_ms: u64,
    factor: u64,
    max_ms: u64,
    jitter_percent: u64,
    max_attempts: u32,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u64, max_attempts: u32) -> Self {
        Self {
            base_ms,
            factor: 2,
            max_ms: 30_000,
            jitter_percent: 25,
            max_attempts,
        }
    }

    pub fn with_jitter(mut self, jitter_percent: u64) -> Self {
        self.jitter_percent = jitter_percent.min(100);
        self
    }

    pub fn with_max_ms(mut self, max_ms: u64) -> Self {
        self.max_ms = max_ms;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether another attempt is allowed after `attempts_made`.
    pub fn should_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay before retry number `retry` (0 for the first retry).
    pub fn delay(&self, retry: u32) -> Duration {
        let nominal = self
            .base_ms
            .saturating_mul(self.factor.saturating_pow(retry.min(20)))
            .min(self.max_ms);
        let spread = nominal * self.jitter_percent / 100;
        let delay = if spread > 0 {
            let offset = rand::thread_rng().gen_range(0..=spread * 2);
            nominal - spread + offset
        } else {
            nominal
        };
        Duration::from_millis(delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_MS, DEFAULT_MAX_ATTEMPTS)
    }
}
