//! Bounded exponential backoff around fallible catalog calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::CatalogError;

/// Retry schedule applied to each page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry (doubles each retry).
    pub initial_delay: Duration,
    /// Maximum retry delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

/// Why a retried operation finally failed.
#[derive(Debug, Clone)]
pub enum RetryFailure {
    /// Every attempt failed transiently.
    Exhausted { attempts: u32, last: CatalogError },
    /// A non-retryable failure; returned immediately.
    Permanent { attempts: u32, error: CatalogError },
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay slept before retry number `retry` (1-based).
    pub fn delay_before(&self, retry: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 1..retry {
            delay = std::cmp::min(delay * 2, self.max_delay);
        }
        std::cmp::min(delay, self.max_delay)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CatalogError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        let mut delay = self.initial_delay;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_transient() => {
                    return Err(RetryFailure::Permanent {
                        attempts: attempt,
                        error,
                    });
                }
                Err(error) => {
                    if attempt >= max_attempts {
                        return Err(RetryFailure::Exhausted {
                            attempts: attempt,
                            last: error,
                        });
                    }

                    warn!(
                        operation = label,
                        error = %error,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Catalog request failed, retrying"
                    );

                    tokio::time::sleep(delay).await;

                    // Exponential backoff
                    delay = std::cmp::min(delay * 2, self.max_delay);
                }
            }
        }
    }
}
