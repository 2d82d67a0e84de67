//! Retry with exponential backoff, shared by the provider clients and the
//! page scraper.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

// 2^10 seconds is already ~17 minutes
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Delay after the failed attempt with zero-based index `attempt`: `2^attempt`
/// seconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    let capped_attempt = attempt.min(MAX_BACKOFF_EXPONENT);
    Duration::from_secs(2_u64.saturating_pow(capped_attempt))
}

/// Errors that know whether another attempt could succeed.
pub trait Retryable: Display + Sized {
    fn should_retry(&self) -> bool;

    /// Converts the last failure once the attempt budget is spent.
    fn exhausted(self, _attempts: u32) -> Self {
        self
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    /// `max_retries` is the total number of attempts; zero is treated as one.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Runs `operation` until it succeeds, fails with a non-retriable error or
    /// the attempt budget is spent. Sleeps only between attempts.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!("{label}: attempt {} failed: {err}", attempt + 1);

                    if !err.should_retry() {
                        return Err(err);
                    }
                    if attempt + 1 >= self.max_retries {
                        error!("{label}: all {} attempts failed", self.max_retries);
                        return Err(err.exhausted(self.max_retries));
                    }

                    self.sleeper.sleep(backoff_delay(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
