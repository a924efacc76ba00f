// In-memory cache store with TTL, bounded capacity, and a per-item size cap.
// Shared by the proxy (keyed by endpoint path) and the stats facade ("stats_cache").

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::error::{PulseError, Result};

/// Default entry lifetime: 14 days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Default maximum number of entries kept after a cleanup pass.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default per-item size cap: 1 MiB of serialized JSON.
pub const DEFAULT_MAX_ITEM_BYTES: usize = 1024 * 1024;

/// Default minimum spacing between cleanup passes.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Limits applied by a [`CacheStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
    pub max_item_bytes: usize,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_item_bytes: DEFAULT_MAX_ITEM_BYTES,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// A cached value with its bookkeeping metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub data: T,
    pub last_updated: DateTime<Utc>,
    pub size_bytes: usize,
}

impl<T> CacheEntry<T> {
    /// Check if this entry has outlived `ttl` as of `now`.
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let elapsed = now
            .signed_duration_since(self.last_updated)
            .to_std()
            .unwrap_or(Duration::ZERO);

        elapsed > ttl
    }
}

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    last_cleanup: DateTime<Utc>,
}

/// TTL keyed store. Cloning shares the underlying entries.
pub struct CacheStore<T> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for CacheStore<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config,
            clock: Arc::clone(&self.clock),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Serialize + Clone> CacheStore<T> {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            config,
            clock,
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                last_cleanup: now,
            })),
        }
    }

    /// Look up a fresh entry. Stale entries are dropped on access.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut inner = self.lock();
        Self::cleanup_locked(&mut inner, &self.config, now);

        let expired = inner.entries.get(key)?.is_expired(self.config.ttl, now);
        if expired {
            debug!(key, "cache entry expired");
            inner.entries.remove(key);
            return None;
        }

        inner.entries.get(key).map(|entry| entry.data.clone())
    }

    /// Store `data` under `key`. Returns false if the payload is too large.
    pub fn set(&self, key: &str, data: T) -> bool {
        self.try_set(key, data).is_ok()
    }

    /// Like [`CacheStore::set`], reporting why a payload was rejected.
    pub fn try_set(&self, key: &str, data: T) -> Result<()> {
        let size = serde_json::to_vec(&data)?.len();
        if size > self.config.max_item_bytes {
            return Err(PulseError::SerializationTooLarge {
                size,
                limit: self.config.max_item_bytes,
            });
        }

        let now = self.clock.now();
        let mut inner = self.lock();
        Self::cleanup_locked(&mut inner, &self.config, now);
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                data,
                last_updated: now,
                size_bytes: size,
            },
        );

        Ok(())
    }

    /// Drop the entry for `key`, if any.
    pub fn remove(&self, key: &str) -> Option<T> {
        self.lock().entries.remove(key).map(|entry| entry.data)
    }

    /// Run a cleanup pass if the cleanup interval has elapsed.
    /// Returns true when a pass actually ran.
    pub fn cleanup(&self) -> bool {
        let now = self.clock.now();
        let mut inner = self.lock();
        Self::cleanup_locked(&mut inner, &self.config, now)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cleanup_locked(inner: &mut Inner<T>, config: &CacheConfig, now: DateTime<Utc>) -> bool {
        let since_last = now
            .signed_duration_since(inner.last_cleanup)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if since_last < config.cleanup_interval {
            return false;
        }

        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| !entry.is_expired(config.ttl, now));

        if inner.entries.len() > config.max_entries {
            let mut by_age: Vec<(DateTime<Utc>, String)> = inner
                .entries
                .values()
                .map(|entry| (entry.last_updated, entry.key.clone()))
                .collect();
            by_age.sort();

            let excess = inner.entries.len() - config.max_entries;
            for (_, key) in by_age.into_iter().take(excess) {
                inner.entries.remove(&key);
            }
        }

        inner.last_cleanup = now;
        debug!(
            removed = before - inner.entries.len(),
            remaining = inner.entries.len(),
            "cache cleanup pass"
        );
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
