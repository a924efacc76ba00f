// Proxy fetch layer.
// Validates endpoint paths, serves fresh cache hits, and forwards misses to GitHub.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::cache::CacheStore;
use crate::error::{PulseError, Result};
use crate::github::GitHubClient;

/// Anything that can resolve a GitHub endpoint path to a JSON payload.
#[async_trait]
pub trait EndpointFetcher: Send + Sync {
    async fn fetch(&self, endpoint: &str, use_cache: bool) -> Result<serde_json::Value>;

    /// Skip any cached copy but keep the fresh response for later cached reads.
    /// Fetchers without a cache just fetch.
    async fn refresh(&self, endpoint: &str) -> Result<serde_json::Value> {
        self.fetch(endpoint, false).await
    }
}

/// How a fetch treats the fetcher's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Serve a fresh cached copy, store misses.
    Cached,
    /// Always go upstream and store the response.
    Refresh,
    /// Always go upstream and leave the cache alone.
    Bypass,
}

/// Fetch `endpoint` and parse it into `T`. A payload that does not match the
/// schema is reported as [`PulseError::Unknown`].
pub async fn fetch_as<T: DeserializeOwned>(
    fetcher: &dyn EndpointFetcher,
    endpoint: &str,
    mode: FetchMode,
) -> Result<T> {
    let value = match mode {
        FetchMode::Cached => fetcher.fetch(endpoint, true).await?,
        FetchMode::Refresh => fetcher.refresh(endpoint).await?,
        FetchMode::Bypass => fetcher.fetch(endpoint, false).await?,
    };
    serde_json::from_value(value).map_err(|e| {
        PulseError::Unknown(format!("Unexpected payload shape from {}: {}", endpoint, e))
    })
}

/// Reject endpoint paths that are empty or not rooted at `/`.
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Err(PulseError::Validation(
            "Endpoint parameter required".to_string(),
        ));
    }
    if !endpoint.starts_with('/') {
        return Err(PulseError::Validation(
            "Endpoint must start with /".to_string(),
        ));
    }
    Ok(())
}

/// Cache-aware forwarder in front of the GitHub API.
pub struct ProxyFetcher {
    client: GitHubClient,
    cache: CacheStore<serde_json::Value>,
}

impl ProxyFetcher {
    pub fn new(client: GitHubClient, cache: CacheStore<serde_json::Value>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &CacheStore<serde_json::Value> {
        &self.cache
    }

    pub fn into_shared(self) -> Arc<dyn EndpointFetcher> {
        Arc::new(self)
    }

    async fn forward(&self, endpoint: &str, store: bool) -> Result<serde_json::Value> {
        let value = self.client.get_json(endpoint).await.inspect_err(|e| {
            warn!(error = %e, "GitHub API request failed");
        })?;

        if store {
            if let Err(e) = self.cache.try_set(endpoint, value.clone()) {
                warn!(error = %e, "Failed to cache data for endpoint - Data too large");
            }
        }

        Ok(value)
    }
}

#[async_trait]
impl EndpointFetcher for ProxyFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, endpoint: &str, use_cache: bool) -> Result<serde_json::Value> {
        validate_endpoint(endpoint)?;

        if use_cache {
            if let Some(hit) = self.cache.get(endpoint) {
                debug!("proxy cache hit");
                return Ok(hit);
            }
        }

        self.forward(endpoint, use_cache).await
    }

    #[instrument(skip(self))]
    async fn refresh(&self, endpoint: &str) -> Result<serde_json::Value> {
        validate_endpoint(endpoint)?;
        self.forward(endpoint, true).await
    }
}
