// Runtime configuration.
// Command line flags with environment fallbacks, converted into component settings.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::batch::{BatchConfig, DEFAULT_CONCURRENCY};
use crate::cache::default_stats_path;
use crate::cache::store::{CacheConfig, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_ITEM_BYTES, DEFAULT_TTL};
use crate::github::GITHUB_API_BASE;
use crate::github::endpoints::Endpoints;
use crate::retry::RetryPolicy;
use crate::stats::FacadeConfig;

/// Cached GitHub activity proxy and statistics service.
#[derive(Parser, Debug, Clone)]
#[command(name = "devpulse")]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Host to bind to
    #[arg(long, short = 'H', default_value = "127.0.0.1", env = "DEVPULSE_HOST")]
    pub host: String,

    /// Port to listen on
    #[arg(long, short, default_value = "3000", env = "DEVPULSE_PORT")]
    pub port: u16,

    /// GitHub account whose stats are served
    #[arg(long, short, env = "GITHUB_USERNAME")]
    pub username: String,

    /// Personal access token; omit for unauthenticated requests
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Upstream API base URL
    #[arg(long, default_value = GITHUB_API_BASE, env = "DEVPULSE_API_BASE")]
    pub api_base: String,

    /// Cache entry lifetime in seconds
    #[arg(long, default_value_t = DEFAULT_TTL.as_secs(), env = "DEVPULSE_CACHE_TTL_SECS")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached entries
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES, env = "DEVPULSE_CACHE_MAX_ENTRIES")]
    pub cache_max_entries: usize,

    /// Largest serialized entry accepted by the cache, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_ITEM_BYTES, env = "DEVPULSE_CACHE_MAX_ITEM_BYTES")]
    pub cache_max_item_bytes: usize,

    /// Requests in flight per language batch
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY, env = "DEVPULSE_BATCH_CONCURRENCY")]
    pub batch_concurrency: usize,

    /// Attempts per upstream request
    #[arg(long, default_value = "3", env = "DEVPULSE_MAX_ATTEMPTS")]
    pub max_attempts: u32,

    /// Per-attempt timeout in milliseconds
    #[arg(long, default_value = "8000", env = "DEVPULSE_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    /// File for the persisted stats record
    #[arg(long, env = "DEVPULSE_STATS_FILE")]
    pub stats_file: Option<PathBuf>,

    /// Keep the stats record in memory only
    #[arg(long, env = "DEVPULSE_NO_DISK_CACHE")]
    pub no_disk_cache: bool,

    /// Emit logs as JSON
    #[arg(long, env = "DEVPULSE_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl_secs),
            max_entries: self.cache_max_entries,
            max_item_bytes: self.cache_max_item_bytes,
            ..CacheConfig::default()
        }
    }

    pub fn retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            ..RetryPolicy::default()
        }
    }

    pub fn batch(&self) -> BatchConfig {
        BatchConfig {
            concurrency: self.batch_concurrency,
            attempt_timeout: self.request_timeout(),
            retry: self.retry(),
        }
    }

    pub fn facade(&self) -> FacadeConfig {
        FacadeConfig {
            endpoints: Endpoints::new(&self.username, self.token.is_some()),
            retry: self.retry(),
            attempt_timeout: self.request_timeout(),
            batch: self.batch(),
        }
    }

    /// Where the stats record is persisted, if anywhere.
    pub fn stats_path(&self) -> Option<PathBuf> {
        if self.no_disk_cache {
            return None;
        }
        self.stats_file.clone().or_else(default_stats_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["devpulse", "--username", "octo"]);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.api_base, GITHUB_API_BASE);

        let cache = config.cache();
        assert_eq!(cache.ttl, Duration::from_secs(14 * 24 * 60 * 60));
        assert_eq!(cache.max_entries, 100);
        assert_eq!(cache.max_item_bytes, 1024 * 1024);

        let batch = config.batch();
        assert_eq!(batch.concurrency, 5);
        assert_eq!(batch.attempt_timeout, Duration::from_secs(8));
        assert_eq!(batch.retry, RetryPolicy::default());
    }

    #[test]
    fn test_overrides() {
        let config = Config::parse_from([
            "devpulse",
            "-u",
            "octo",
            "--port",
            "8080",
            "--batch-concurrency",
            "2",
            "--max-attempts",
            "1",
            "--stats-file",
            "/tmp/stats.json",
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.batch().concurrency, 2);
        assert_eq!(config.retry().max_attempts, 1);
        assert_eq!(config.stats_path(), Some(PathBuf::from("/tmp/stats.json")));
    }

    #[test]
    fn test_no_disk_cache_wins() {
        let config = Config::parse_from([
            "devpulse",
            "-u",
            "octo",
            "--stats-file",
            "/tmp/stats.json",
            "--no-disk-cache",
        ]);
        assert_eq!(config.stats_path(), None);
    }

    #[test]
    fn test_token_selects_authenticated_endpoints() {
        let authed = Config::parse_from(["devpulse", "-u", "octo", "--token", "abc"]);
        let facade = authed.facade();
        assert_eq!(facade.endpoints.profile(), "/user");
        assert_eq!(facade.endpoints.username(), "octo");
    }
}
