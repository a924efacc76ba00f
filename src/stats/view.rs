// Consumer-side view of the stats record.
// Holds the loading state for one consumer and drops results that arrive after it is disposed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use super::facade::StatsFacade;
use super::record::StatsRecord;

/// Loading state for async data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadingState<T> {
    #[default]
    Idle,
    Loading,
    Loaded(T),
    Error(String),
}

impl<T> LoadingState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadingState::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadingState::Loaded(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            LoadingState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

/// Which facade operation a [`StatsView`] should drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    CacheFirst,
    ForceRefresh,
    Retry,
}

/// One consumer of the stats record.
///
/// Once [`dispose`](StatsView::dispose) is called the view ignores every
/// result still in flight.
#[derive(Debug)]
pub struct StatsView {
    state: Mutex<LoadingState<Arc<StatsRecord>>>,
    alive: AtomicBool,
}

impl Default for StatsView {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsView {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoadingState::Idle),
            alive: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> LoadingState<Arc<StatsRecord>> {
        self.lock().clone()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn dispose(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Run `mode` against `facade` and publish the outcome.
    ///
    /// Returns false when the view was disposed before the outcome arrived.
    pub async fn drive(&self, facade: &StatsFacade, mode: LoadMode) -> bool {
        if !self.is_alive() {
            return false;
        }
        *self.lock() = LoadingState::Loading;

        let result = match mode {
            LoadMode::CacheFirst => facade.load().await,
            LoadMode::ForceRefresh => facade.force_refresh().await,
            LoadMode::Retry => facade.retry().await,
        };

        if !self.is_alive() {
            debug!(?mode, "view disposed, dropping stats result");
            return false;
        }

        *self.lock() = match result {
            Ok(record) => LoadingState::Loaded(record),
            Err(e) => LoadingState::Error(e.to_string()),
        };
        true
    }

    fn lock(&self) -> MutexGuard<'_, LoadingState<Arc<StatsRecord>>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::cache::{CacheConfig, CacheStore};
    use crate::clock::SystemClock;
    use crate::error::{PulseError, Result};
    use crate::github::endpoints::Endpoints;
    use crate::proxy::EndpointFetcher;
    use crate::retry::RetryPolicy;
    use crate::stats::facade::FacadeConfig;

    /// Fails every request, optionally after a delay.
    struct DownFetcher {
        delay: Duration,
    }

    #[async_trait]
    impl EndpointFetcher for DownFetcher {
        async fn fetch(&self, _endpoint: &str, _use_cache: bool) -> Result<Value> {
            tokio::time::sleep(self.delay).await;
            Err(PulseError::UpstreamUnavailable)
        }
    }

    fn facade(delay: Duration) -> StatsFacade {
        let mut config = FacadeConfig::new(Endpoints::new("octo", false));
        config.retry = RetryPolicy::none();
        let clock = Arc::new(SystemClock);
        StatsFacade::new(
            Arc::new(DownFetcher { delay }),
            CacheStore::new(CacheConfig::default(), clock.clone()),
            None,
            clock,
            config,
        )
    }

    #[test]
    fn test_loading_state_helpers() {
        let state: LoadingState<u32> = LoadingState::default();
        assert_eq!(state, LoadingState::Idle);
        assert!(LoadingState::<u32>::Loading.is_loading());
        assert_eq!(LoadingState::Loaded(3).data(), Some(&3));
        assert!(!LoadingState::<u32>::Error("x".into()).is_loaded());
    }

    #[tokio::test]
    async fn test_error_is_published() {
        let view = StatsView::new();
        assert!(view.drive(&facade(Duration::ZERO), LoadMode::CacheFirst).await);

        match view.state() {
            LoadingState::Error(message) => {
                assert!(message.contains("temporarily unavailable"), "{}", message)
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disposed_view_ignores_late_result() {
        let view = Arc::new(StatsView::new());
        let facade = facade(Duration::from_millis(50));

        let driver = {
            let view = view.clone();
            let facade = facade.clone();
            tokio::spawn(async move { view.drive(&facade, LoadMode::CacheFirst).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(view.state().is_loading());
        view.dispose();

        assert!(!driver.await.unwrap());
        assert!(view.state().is_loading());
        assert!(!view.drive(&facade, LoadMode::Retry).await);
    }
}
