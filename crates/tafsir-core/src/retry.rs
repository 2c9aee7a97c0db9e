//! Bounded retry with backoff, plus the inter-call throttle

use std::time::Duration;

use indicatif::ProgressBar;

use crate::error::ProviderError;

/// Retry settings for provider calls.
///
/// `max_attempts` counts the first call. The delay before attempt `n + 1` is
/// `base_delay * 2^(n - 1)`: the configured delay after the first failure,
/// doubled after the second, and so on. A `RateLimited` failure carrying a
/// `Retry-After` hint waits at least that long.
///
/// `throttle` is slept after every call that reaches the provider, success or
/// not, to stay under provider throughput limits. It is not a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub throttle: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            throttle: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Policy with no sleeping at all (tests, dry runs)
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            throttle: Duration::ZERO,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Delay after the `attempt`-th failure (1-based)
    pub fn backoff(&self, attempt: u32, err: &ProviderError) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exp);
        match err {
            ProviderError::RateLimited {
                retry_after: Some(hint),
                ..
            } => backoff.max(*hint),
            _ => backoff,
        }
    }

    /// Run `attempt_fn` until it succeeds, fails permanently, or the attempt
    /// budget is spent. The returned error is always the last one observed.
    pub fn run<T>(
        &self,
        label: &str,
        pb: &ProgressBar,
        mut attempt_fn: impl FnMut() -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let max = self.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = attempt_fn();
            self.pause();
            match result {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < max => {
                    let delay = self.backoff(attempt, &e);
                    pb.set_message(format!("{label}: retry {attempt}/{}", max - 1));
                    log::warn!(
                        "{label}: attempt {attempt}/{max} failed: {e}, retrying in {:.1}s",
                        delay.as_secs_f64()
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => {
                    if e.is_retryable() {
                        log::error!("{label}: giving up after {attempt} attempts: {e}");
                    } else {
                        log::error!("{label}: not retryable: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }

    fn pause(&self) {
        if !self.throttle.is_zero() {
            std::thread::sleep(self.throttle);
        }
    }
}
