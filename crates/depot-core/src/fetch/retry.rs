//! Bounded exponential backoff beneath the batch fetcher.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Retry budget for one logical HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(8_000),
        }
    }
}

/// Whether repeating a request can duplicate server-side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    Idempotent,
    Mutating,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `operation` until it succeeds, fails permanently or the budget runs out.
    pub async fn run<T, F, Fut>(&self, idempotency: Idempotency, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt + 1 < max_attempts && is_retryable(&error, idempotency) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "Request failed (attempt {}/{max_attempts}): {error}; retrying in {delay:?}",
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Classify a failed request.
///
/// Mutating requests are only repeated when the connection was never
/// established, since the server cannot have seen them.
pub fn is_retryable(error: &Error, idempotency: Idempotency) -> bool {
    match (error, idempotency) {
        (Error::Http(error), _) if error.is_connect() => true,
        (_, Idempotency::Mutating) => false,
        (Error::Http(error), Idempotency::Idempotent) => error.is_timeout(),
        (Error::HttpStatus { status, .. }, Idempotency::Idempotent) => {
            is_retryable_status(*status)
        }
        (Error::Network(_), Idempotency::Idempotent) => true,
        _ => false,
    }
}

/// 408, 429 and every 5xx.
pub const fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}
