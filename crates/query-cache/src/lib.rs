//! Range Query Result Cache
//!
//! Stores the output of an externally executed time-series query together
//! with the time range it covers, and decides whether a cached result can
//! answer a request for a slightly shifted range.
//!
//! # Features
//!
//! - **LRU Eviction**: Least recently used entries are evicted when capacity is reached
//! - **TTL Support**: Absolute per-entry expiry measured from the last insertion
//! - **Resolution-Aware Staleness**: Boundary drift smaller than one data-point bucket is ignored
//! - **Thread-Safe**: Safe for concurrent access using `RwLock`
//! - **Statistics**: Track hits, misses, stale entries, evictions and expirations
//!
//! # Example
//!
//! ```ignore
//! use query_cache::{CacheConfig, CacheEntry, CacheKey, QueryCache};
//!
//! let cache = QueryCache::new(CacheConfig::new(100, 10));
//! let key = CacheKey::for_range(sql, max_data_points, &requested);
//!
//! if let Some(entry) = cache.get(&key) {
//!     if !key.expired(&entry.time_range, &requested, 10) {
//!         return Ok(entry.tables);
//!     }
//! }
//!
//! let tables = runner.run(&query).await?;
//! cache.put(key, CacheEntry::new(tables.clone(), requested));
//! ```

pub mod cache;
pub mod config;
pub mod expiry;
pub mod stats;

pub use cache::{CacheEntry, CacheKey, QueryCache};
pub use config::{CacheConfig, CacheSettings};
pub use expiry::{is_stale, tolerance_seconds};
pub use stats::{CacheStats, CacheStatsSnapshot};
