// Batch request orchestrator.
// Runs per-item fetches in sequential fixed-size batches with retry, timeout, and progress.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::error::Result;
use crate::retry::{DEFAULT_ATTEMPT_TIMEOUT, RetryPolicy, retry_with};

/// Default number of requests in flight per batch.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Settings for a [`BatchRunner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchConfig {
    pub concurrency: usize,
    pub attempt_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Issues many independent requests without exceeding `concurrency` at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchRunner {
    config: BatchConfig,
}

impl BatchRunner {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    /// Fetch every item, returning one slot per input in input order.
    ///
    /// A slot is `None` when its item still failed after all retries. After
    /// each batch `on_progress` receives the rounded percentage processed.
    pub async fn run<T, R, F, Fut, P>(&self, items: &[T], fetch: F, mut on_progress: P) -> Vec<Option<R>>
    where
        F: Fn(&T) -> Fut,
        Fut: Future<Output = Result<R>>,
        P: FnMut(u8),
    {
        let total = items.len();
        let concurrency = self.config.concurrency.max(1);
        let mut results = Vec::with_capacity(total);

        for (index, batch) in items.chunks(concurrency).enumerate() {
            let calls = batch.iter().map(|item| {
                retry_with(&self.config.retry, self.config.attempt_timeout, || fetch(item))
            });
            let settled = join_all(calls).await;

            let failed = settled.iter().filter(|r| r.is_err()).count();
            for outcome in settled {
                match outcome {
                    Ok(value) => results.push(Some(value)),
                    Err(e) => {
                        warn!(batch = index, error = %e, "batch item failed");
                        results.push(None);
                    }
                }
            }

            let progress = progress_percent(results.len(), total);
            debug!(batch = index, failed, progress, "batch complete");
            on_progress(progress);
        }

        results
    }
}

/// Rounded percentage of `done` out of `total`.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
