//! Fixed-interval retry with optional jitter
//!
//! Drives the exclusive set: the same conditional write is polled until it
//! wins or the retry budget runs out.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries used when the caller passes a non-positive count, whatever the policy says
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Wait between two attempts when nothing else is configured
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5);

/// How often, and how far apart, a contended write is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait between attempts
    pub interval: Duration,
    /// Upper bound of the random extra wait added to `interval`
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_INTERVAL,
            jitter: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    /// Policy with the default budget and interval, no jitter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry budget; zero or negative means [`DEFAULT_MAX_RETRIES`]
    pub fn with_retries(mut self, retries: i32) -> Self {
        self.max_retries = if retries > 0 {
            retries as u32
        } else {
            DEFAULT_MAX_RETRIES
        };
        self
    }

    /// Set the wait between attempts
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the jitter bound
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total attempts, the first one included
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Longest time spent waiting if every attempt fails
    pub fn worst_case_wait(&self) -> Duration {
        (self.interval + self.jitter) * self.max_retries
    }

    /// Wait before the next attempt
    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.interval;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter.as_micros() as u64);
        self.interval + Duration::from_micros(extra)
    }

    /// Poll `attempt` until it reports success or the budget is spent.
    ///
    /// Returns `Ok(true)` on the first success, `Ok(false)` once every attempt
    /// came back `false`. An error ends the loop immediately.
    pub async fn poll<F, Fut, E>(&self, mut attempt: F) -> Result<bool, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let attempts = self.attempts();
        for n in 1..=attempts {
            if attempt().await? {
                if n > 1 {
                    debug!("Attempt {}/{} succeeded", n, attempts);
                }
                return Ok(true);
            }

            if n < attempts {
                tokio::time::sleep(self.next_delay()).await;
            }
        }

        debug!("All {} attempts failed", attempts);
        Ok(false)
    }
}
