// Cache module.
// Bounded in-memory TTL store plus an optional on-disk slot for the stats record.

pub mod persist;
pub mod store;

pub use persist::{CachedData, DiskSlot, default_stats_path};
pub use store::{CacheConfig, CacheEntry, CacheStore};
