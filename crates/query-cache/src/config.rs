//! Cache configuration options

use query_core::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the query cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries in the cache
    pub max_entries: usize,
    /// Time-to-live for cache entries, measured from insertion
    pub ttl: Duration,
    /// Upper bound, in minutes, on the boundary drift tolerated by the
    /// staleness check
    pub max_ttl_minutes: i64,
    /// Whether caching is enabled
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(300), // 5 minutes
            max_ttl_minutes: 5,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with the given capacity and TTL.
    ///
    /// The drift ceiling defaults to the TTL.
    pub fn new(max_entries: usize, ttl_minutes: u64) -> Self {
        Self {
            max_entries,
            ttl: Duration::from_secs(ttl_minutes.saturating_mul(60)),
            max_ttl_minutes: i64::try_from(ttl_minutes).unwrap_or(i64::MAX),
            enabled: true,
        }
    }

    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the maximum number of entries
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Set the TTL duration
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the drift ceiling used by the staleness check
    pub fn with_max_ttl_minutes(mut self, max_ttl_minutes: i64) -> Self {
        self.max_ttl_minutes = max_ttl_minutes;
        self
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether entries can be retained at all.
    ///
    /// A zero capacity or zero TTL behaves as an always-miss cache.
    pub fn retains_entries(&self) -> bool {
        self.enabled && self.max_entries > 0 && !self.ttl.is_zero()
    }
}

/// Cache settings as stored in a data source instance's JSON configuration.
///
/// Other keys in the same document (connection details and so on) are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    #[serde(default)]
    pub cache_enabled: bool,
    #[serde(default)]
    pub cache_max_entries: i64,
    #[serde(default)]
    pub cache_ttl_minutes: i64,
    /// Drift ceiling; falls back to `cache_ttl_minutes` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_max_ttl_minutes: Option<i64>,
}

impl CacheSettings {
    /// Parse settings from raw instance JSON
    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Convert to a runtime configuration.
    ///
    /// Negative values are clamped to zero, which disables retention rather
    /// than failing.
    pub fn into_config(self) -> CacheConfig {
        let ttl_minutes = self.cache_ttl_minutes.max(0);
        CacheConfig {
            max_entries: usize::try_from(self.cache_max_entries.max(0)).unwrap_or(usize::MAX),
            ttl: Duration::from_secs((ttl_minutes as u64).saturating_mul(60)),
            max_ttl_minutes: self.cache_max_ttl_minutes.unwrap_or(ttl_minutes).max(0),
            enabled: self.cache_enabled,
        }
    }
}

impl From<CacheSettings> for CacheConfig {
    fn from(settings: CacheSettings) -> Self {
        settings.into_config()
    }
}
