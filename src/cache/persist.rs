// On-disk slot for the presentation-level stats cache.
// Stores a single `{ data, timestamp }` JSON document and honours a TTL on read.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::clock::Clock;
use crate::error::Result;

/// File name used for the persisted stats cache.
pub const STATS_FILE_NAME: &str = "stats_cache.json";

/// Get the base cache directory (~/.cache/devpulse on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "devpulse").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Default location of the persisted stats cache.
pub fn default_stats_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join(STATS_FILE_NAME))
}

/// Wire shape of a persisted value. `timestamp` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CachedData<T> {
    pub fn new(data: T, at: DateTime<Utc>) -> Self {
        Self {
            data,
            timestamp: at.timestamp_millis(),
        }
    }

    /// Check if this value is still within `ttl` as of `now`.
    pub fn is_valid(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age_ms = now.timestamp_millis() - self.timestamp;
        age_ms >= 0 && (age_ms as u128) <= ttl.as_millis()
    }
}

/// A single JSON file holding one TTL'd value.
pub struct DiskSlot {
    path: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl DiskSlot {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored value if present and fresh.
    /// Unreadable or stale files are removed and treated as a miss.
    pub fn read<T: DeserializeOwned>(&self) -> Option<T> {
        let cached = match read_cached::<T>(&self.path) {
            Ok(cached) => cached?,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable stats cache");
                self.clear();
                return None;
            }
        };

        if cached.is_valid(self.ttl, self.clock.now()) {
            Some(cached.data)
        } else {
            self.clear();
            None
        }
    }

    /// Persist `data`, stamped with the current time.
    pub fn write<T: Serialize>(&self, data: &T) -> Result<()> {
        write_cached(&self.path, &CachedData::new(data, self.clock.now()))
    }

    /// Remove the file. Missing files are fine.
    pub fn clear(&self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %e, "failed to remove stats cache");
            }
        }
    }
}

fn read_cached<T: DeserializeOwned>(path: &Path) -> Result<Option<CachedData<T>>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)?;
    let cached: CachedData<T> = serde_json::from_str(&contents)?;
    Ok(Some(cached))
}

fn write_cached<T: Serialize>(path: &Path, cached: &CachedData<T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string(cached)?;

    // Write atomically via temp file
    let temp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;

    Ok(())
}
