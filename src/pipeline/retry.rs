use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::{foundation::error::StillmotionError, pipeline::config::PipelineConfig};

/// Bounded sequential retry with linear backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below one.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.attempts(), config.retry_base_delay)
    }

    /// Wait after failed attempt `attempt` (1-based): `base_delay × attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// The last error of an operation, with the number of attempts spent on it.
#[derive(Debug)]
pub struct Exhausted {
    pub error: StillmotionError,
    pub attempts: u32,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or runs out of attempts.
///
/// `op` receives the 1-based attempt number. Attempts never overlap: each waits for the previous
/// one and its backoff delay.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, Exhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, StillmotionError>>,
{
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_retryable() && attempt < policy.attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts = policy.attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "stage failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return Err(Exhausted {
                    error,
                    attempts: attempt,
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/retry.rs"]
mod tests;
