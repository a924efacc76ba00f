// Retry policy and retrying call wrapper.
// Exponential backoff between attempts, with a timeout applied to each attempt.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::{PulseError, Result};

/// Default per-attempt timeout.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);

/// How many times to try a call and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes a single attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after the failed attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .mul_f64(self.backoff_multiplier.powi(attempt as i32))
    }
}

/// Run `call` under `policy`, bounding each attempt by `timeout`.
///
/// Errors that cannot succeed on repeat (see [`PulseError::is_retryable`])
/// are returned immediately. Otherwise the last error is returned once all
/// attempts are used.
pub async fn retry_with<T, F, Fut>(policy: &RetryPolicy, timeout: Duration, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(PulseError::Timeout(timeout)),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_for(attempt);
                debug!(attempt, ?delay, error = %e, "attempt failed, backing off");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
