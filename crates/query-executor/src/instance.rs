//! Per data-source instance lifecycle
//!
//! The host creates one instance per data source configuration and disposes
//! of it when the configuration changes or the data source is removed. Each
//! instance owns its own cache; nothing is shared process-wide.

use crate::cached_executor::{CachedQueryExecutor, QueryResponse};
use crate::runner::{QueryRunner, RangeQuery};
use query_cache::{CacheConfig, CacheSettings};
use query_core::Result;
use std::collections::HashMap;
use tracing::info;

/// A configured data source and the cache that belongs to it
pub struct DataSourceInstance<R> {
    executor: CachedQueryExecutor<R>,
}

impl<R: QueryRunner> DataSourceInstance<R> {
    /// Create an instance from the data source's raw JSON settings
    pub fn from_settings(json: &[u8], runner: R) -> Result<Self> {
        let settings = CacheSettings::from_json(json)?;
        Ok(Self::with_config(settings.into_config(), runner))
    }

    /// Create an instance with an explicit cache configuration
    pub fn with_config(config: CacheConfig, runner: R) -> Self {
        info!(
            enabled = config.enabled,
            max_entries = config.max_entries,
            ttl_secs = config.ttl.as_secs(),
            max_ttl_minutes = config.max_ttl_minutes,
            "Creating data source instance"
        );
        Self {
            executor: CachedQueryExecutor::new(runner, config),
        }
    }

    pub fn executor(&self) -> &CachedQueryExecutor<R> {
        &self.executor
    }

    /// Run one query through the instance's cache
    pub async fn query(&self, query: &RangeQuery) -> Result<QueryResponse> {
        self.executor.execute(query).await
    }

    /// Run a batched request, one response per `ref_id`
    pub async fn query_all(&self, queries: &[RangeQuery]) -> HashMap<String, Result<QueryResponse>> {
        self.executor.execute_all(queries).await
    }

    /// Release every cached entry. Called by the host at teardown.
    pub fn dispose(&self) {
        self.executor.purge_cache();
        info!("Disposing of data source instance");
    }
}
