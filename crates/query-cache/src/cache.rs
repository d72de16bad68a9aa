//! Bounded LRU result cache with per-entry TTL

use crate::config::CacheConfig;
use crate::expiry;
use crate::stats::CacheStats;
use ahash::RandomState;
use arrow::record_batch::RecordBatch;
use lru::LruCache;
use parking_lot::RwLock;
use query_core::TimeRange;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Identity of a cached result.
///
/// Besides the literal query text, the key carries the two parameters that
/// fix the query's resolution. It is deliberately not tied to a concrete
/// time range, so the same key is reused as a dashboard window slides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Literal query text; textually different queries never share a key
    pub query: String,
    /// Maximum number of data points the caller asked for
    pub max_data_points: i64,
    /// Width in seconds of the originally requested range
    pub duration_seconds: i64,
}

impl CacheKey {
    pub fn new(query: impl Into<String>, max_data_points: i64, duration_seconds: i64) -> Self {
        Self {
            query: query.into(),
            max_data_points,
            duration_seconds,
        }
    }

    /// Key for a request over `range`, taking the duration from the range width
    pub fn for_range(query: impl Into<String>, max_data_points: i64, range: &TimeRange) -> Self {
        Self::new(query, max_data_points, range.duration_seconds())
    }

    /// Whether an entry cached for `cached` is too far off to answer a
    /// request for `requested`, given this key's resolution.
    pub fn expired(&self, cached: &TimeRange, requested: &TimeRange, max_ttl_minutes: i64) -> bool {
        expiry::is_stale(
            cached,
            requested,
            max_ttl_minutes,
            self.max_data_points,
            self.duration_seconds,
        )
    }
}

/// Cached query output and the range it was computed for
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Result tables, opaque to the cache
    pub tables: Vec<RecordBatch>,
    /// Range the tables actually cover
    pub time_range: TimeRange,
}

impl CacheEntry {
    pub fn new(tables: Vec<RecordBatch>, time_range: TimeRange) -> Self {
        Self { tables, time_range }
    }

    /// Total number of rows across all tables
    pub fn num_rows(&self) -> usize {
        self.tables.iter().map(|batch| batch.num_rows()).sum()
    }
}

/// Entry plus the instant its TTL clock started
struct StoredEntry {
    entry: CacheEntry,
    inserted_at: Instant,
}

impl StoredEntry {
    fn new(entry: CacheEntry) -> Self {
        Self {
            entry,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Thread-safe LRU cache for range query results.
///
/// Entries leave the cache through capacity eviction, TTL expiry, `remove`,
/// `purge`, or being overwritten by a later `put` for the same key. The
/// resolution-aware staleness check is applied by callers on top of a hit.
pub struct QueryCache {
    cache: RwLock<LruCache<CacheKey, StoredEntry, RandomState>>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
}

impl QueryCache {
    /// Create a new query cache with the given configuration
    pub fn new(config: CacheConfig) -> Self {
        // Zero capacity never stores anything (see `CacheConfig::retains_entries`),
        // the map still needs a non-zero size.
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::with_hasher(capacity, RandomState::new())),
            config,
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Create a cache with default configuration
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Check if caching is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Look up an entry, marking it most recently used.
    ///
    /// An entry whose TTL has run out is dropped and reported as missing.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        if !self.config.retains_entries() {
            return None;
        }

        let mut cache = self.cache.write();
        let lookup = cache.get(key).map(|stored| {
            if stored.is_expired(self.config.ttl) {
                None
            } else {
                Some(stored.entry.clone())
            }
        });

        match lookup {
            Some(Some(entry)) => {
                drop(cache);
                self.stats.record_hit();
                debug!(query = %key.query, range = %entry.time_range, "Cache hit");
                Some(entry)
            }
            Some(None) => {
                cache.pop(key);
                let entry_count = cache.len() as u64;
                drop(cache);

                self.stats.record_expiration();
                self.stats.record_miss();
                self.stats.set_entry_count(entry_count);
                debug!(query = %key.query, "Cache entry expired");
                None
            }
            None => {
                drop(cache);
                self.stats.record_miss();
                None
            }
        }
    }

    /// Insert or overwrite an entry.
    ///
    /// Restarts the TTL clock for the key and marks it most recently used.
    /// Inserting a new key into a full cache evicts the least recently used
    /// entry.
    pub fn put(&self, key: CacheKey, entry: CacheEntry) {
        if !self.config.retains_entries() {
            return;
        }

        let stored = StoredEntry::new(entry);
        let mut cache = self.cache.write();
        let replacing = cache.contains(&key);

        if let Some((evicted_key, _)) = cache.push(key, stored) {
            if !replacing {
                self.stats.record_eviction();
                debug!(query = %evicted_key.query, "Evicted least recently used entry");
            }
        }

        let entry_count = cache.len() as u64;
        drop(cache);
        self.stats.set_entry_count(entry_count);
    }

    /// Remove an entry from the cache
    pub fn remove(&self, key: &CacheKey) -> bool {
        let (removed, entry_count) = {
            let mut cache = self.cache.write();
            let removed = cache.pop(key).is_some();
            (removed, cache.len() as u64)
        };

        if removed {
            self.stats.set_entry_count(entry_count);
        }
        removed
    }

    /// Drop every entry immediately, regardless of remaining TTL
    pub fn purge(&self) {
        let purged = {
            let mut cache = self.cache.write();
            let purged = cache.len();
            cache.clear();
            purged
        };

        self.stats.set_entry_count(0);
        debug!(purged, "Purged query cache");
    }

    /// Remove all entries whose TTL has run out, returning how many were removed
    pub fn expire_stale(&self) -> usize {
        let mut cache = self.cache.write();
        let ttl = self.config.ttl;

        let expired_keys: Vec<CacheKey> = cache
            .iter()
            .filter(|(_, stored)| stored.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            cache.pop(key);
            self.stats.record_expiration();
        }

        self.stats.set_entry_count(cache.len() as u64);
        expired_keys.len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Number of stored entries, including expired ones not yet swept
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("enabled", &self.config.enabled)
            .field("max_entries", &self.config.max_entries)
            .field("ttl", &self.config.ttl)
            .field("max_ttl_minutes", &self.config.max_ttl_minutes)
            .field("current_entries", &self.len())
            .finish()
    }
}
