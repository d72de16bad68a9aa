//! Cached Query Executor
//!
//! Wraps a [`QueryRunner`] with a [`QueryCache`], reusing a cached result
//! while the requested range stays within one data-point bucket of the
//! range it was computed for.

use crate::runner::{QueryRunner, RangeQuery};
use arrow::record_batch::RecordBatch;
use futures::future::join_all;
use query_cache::{CacheConfig, CacheEntry, CacheStats, QueryCache};
use query_core::{Result, TimeRange};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Result of executing a single range query
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// Result tables
    pub tables: Vec<RecordBatch>,
    /// Range the tables cover; for a cached response this is the range of
    /// the original execution, not the requested one
    pub time_range: TimeRange,
    /// Whether the tables came from the cache
    pub from_cache: bool,
}

impl QueryResponse {
    fn cached(entry: CacheEntry) -> Self {
        Self {
            tables: entry.tables,
            time_range: entry.time_range,
            from_cache: true,
        }
    }

    fn fresh(tables: Vec<RecordBatch>, time_range: TimeRange) -> Self {
        Self {
            tables,
            time_range,
            from_cache: false,
        }
    }
}

/// A query executor with built-in caching support
pub struct CachedQueryExecutor<R> {
    /// The external query runner
    runner: R,
    /// The query cache
    cache: Arc<QueryCache>,
}

impl<R: QueryRunner> CachedQueryExecutor<R> {
    /// Create a new cached executor with the given cache configuration
    pub fn new(runner: R, config: CacheConfig) -> Self {
        Self {
            runner,
            cache: Arc::new(QueryCache::new(config)),
        }
    }

    /// Create a cached executor with a shared cache
    pub fn with_cache(runner: R, cache: Arc<QueryCache>) -> Self {
        Self { runner, cache }
    }

    /// Execute a query, answering from the cache when possible.
    ///
    /// A cached entry is used when its range is within tolerance of the
    /// requested one; otherwise it counts as a miss. Runner errors are
    /// returned as-is and nothing is cached for them.
    pub async fn execute(&self, query: &RangeQuery) -> Result<QueryResponse> {
        if !self.cache.is_enabled() {
            return self.execute_uncached(query).await;
        }

        let cache_key = query.cache_key();

        if let Some(entry) = self.cache.get(&cache_key) {
            let max_ttl_minutes = self.cache.config().max_ttl_minutes;
            if !cache_key.expired(&entry.time_range, &query.time_range, max_ttl_minutes) {
                return Ok(QueryResponse::cached(entry));
            }
            self.cache.stats().record_stale();
            debug!(
                ref_id = %query.ref_id,
                cached = %entry.time_range,
                requested = %query.time_range,
                "Cached range drifted too far, re-running query"
            );
        }

        let tables = self.runner.run(query).await?;
        self.cache.put(
            cache_key,
            CacheEntry::new(tables.clone(), query.time_range),
        );

        Ok(QueryResponse::fresh(tables, query.time_range))
    }

    /// Execute a batch of queries concurrently, keyed by `ref_id`.
    ///
    /// A failing query only affects its own response.
    pub async fn execute_all(&self, queries: &[RangeQuery]) -> HashMap<String, Result<QueryResponse>> {
        let results = join_all(queries.iter().map(|query| self.execute(query))).await;

        queries
            .iter()
            .map(|query| query.ref_id.clone())
            .zip(results)
            .collect()
    }

    /// Execute without caching (bypass cache)
    pub async fn execute_uncached(&self, query: &RangeQuery) -> Result<QueryResponse> {
        let tables = self.runner.run(query).await?;
        Ok(QueryResponse::fresh(tables, query.time_range))
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> Arc<CacheStats> {
        self.cache.stats()
    }

    /// Get the underlying cache
    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// Get the underlying runner
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Clear all cached entries
    pub fn purge_cache(&self) {
        self.cache.purge();
    }

    /// Check if caching is enabled
    pub fn is_cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Get the number of cached entries
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use query_core::QueryError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SIX_HOURS: i64 = 36_000;

    /// Returns one row per call, numbered by call order
    #[derive(Default)]
    struct CountingRunner {
        calls: AtomicUsize,
    }

    impl CountingRunner {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueryRunner for CountingRunner {
        async fn run(&self, query: &RangeQuery) -> Result<Vec<RecordBatch>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
            if query.query.contains("broken") {
                return Err(QueryError::ExecutionError("warehouse unavailable".into()));
            }
            let schema = Arc::new(Schema::new(vec![Field::new("call", DataType::Int64, false)]));
            let batch = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![call]))])?;
            Ok(vec![batch])
        }
    }

    fn range(from: i64, to: i64) -> TimeRange {
        TimeRange::new(
            Utc.timestamp_opt(from, 0).unwrap(),
            Utc.timestamp_opt(to, 0).unwrap(),
        )
        .unwrap()
    }

    fn query(ref_id: &str, sql: &str, time_range: TimeRange) -> RangeQuery {
        RangeQuery::new(ref_id, sql, 100, time_range)
    }

    fn executor(config: CacheConfig) -> (Arc<CountingRunner>, CachedQueryExecutor<Arc<CountingRunner>>) {
        let runner = Arc::new(CountingRunner::default());
        let executor = CachedQueryExecutor::new(Arc::clone(&runner), config);
        (runner, executor)
    }

    #[tokio::test]
    async fn test_cached_execution() {
        let (runner, executor) = executor(CacheConfig::new(100, 10));
        let q = query("A", "SELECT avg(load) FROM cpu", range(0, SIX_HOURS));

        let first = executor.execute(&q).await.unwrap();
        assert!(!first.from_cache);
        assert_eq!(executor.cache_stats().misses(), 1);

        let second = executor.execute(&q).await.unwrap();
        assert!(second.from_cache);
        assert_eq!(second.tables, first.tables);
        assert_eq!(executor.cache_stats().hits(), 1);
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test]
    async fn test_small_drift_served_from_cache() {
        let (runner, executor) = executor(CacheConfig::new(100, 10));
        let original = range(0, SIX_HOURS);

        executor.execute(&query("A", "SELECT 1", original)).await.unwrap();
        let shifted = executor
            .execute(&query("A", "SELECT 1", range(300, SIX_HOURS + 300)))
            .await
            .unwrap();

        assert!(shifted.from_cache);
        assert_eq!(shifted.time_range, original);
        assert_eq!(runner.calls(), 1);
    }

    #[tokio::test]
    async fn test_large_drift_reruns_and_replaces_entry() {
        let (runner, executor) = executor(CacheConfig::new(100, 10));

        executor.execute(&query("A", "SELECT 1", range(0, SIX_HOURS))).await.unwrap();
        let moved = range(400, SIX_HOURS + 400);
        let response = executor.execute(&query("A", "SELECT 1", moved)).await.unwrap();

        assert!(!response.from_cache);
        assert_eq!(runner.calls(), 2);
        assert_eq!(executor.cache_stats().stale(), 1);
        assert_eq!(executor.cache_size(), 1);

        let stored = executor.cache().get(&query("A", "SELECT 1", moved).cache_key()).unwrap();
        assert_eq!(stored.time_range, moved);
    }

    #[tokio::test]
    async fn test_low_ceiling_forces_rerun() {
        let config = CacheConfig::new(100, 10).with_max_ttl_minutes(1);
        let (runner, executor) = executor(config);

        executor.execute(&query("A", "SELECT 1", range(0, SIX_HOURS))).await.unwrap();
        let response = executor
            .execute(&query("A", "SELECT 1", range(100, SIX_HOURS + 100)))
            .await
            .unwrap();

        assert!(!response.from_cache);
        assert_eq!(runner.calls(), 2);
    }

    #[tokio::test]
    async fn test_runner_error_not_cached() {
        let (runner, executor) = executor(CacheConfig::new(100, 10));
        let q = query("A", "SELECT broken", range(0, SIX_HOURS));

        let err = executor.execute(&q).await.unwrap_err();
        assert!(matches!(err, QueryError::ExecutionError(_)));
        assert_eq!(executor.cache_size(), 0);

        assert!(executor.execute(&q).await.is_err());
        assert_eq!(runner.calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_runs() {
        let (runner, executor) = executor(CacheConfig::disabled());
        let q = query("A", "SELECT 1", range(0, SIX_HOURS));

        assert!(!executor.is_cache_enabled());
        executor.execute(&q).await.unwrap();
        executor.execute(&q).await.unwrap();

        assert_eq!(runner.calls(), 2);
        assert_eq!(executor.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_zero_data_points_never_reuses() {
        let (runner, executor) = executor(CacheConfig::new(100, 10));
        let q = RangeQuery::new("A", "SELECT 1", 0, range(0, SIX_HOURS));

        executor.execute(&q).await.unwrap();
        let second = executor.execute(&q).await.unwrap();

        assert!(!second.from_cache);
        assert_eq!(runner.calls(), 2);
    }

    #[tokio::test]
    async fn test_execute_all_isolates_failures() {
        let (runner, executor) = executor(CacheConfig::new(100, 10));
        let queries = vec![
            query("A", "SELECT 1", range(0, SIX_HOURS)),
            query("B", "SELECT broken", range(0, SIX_HOURS)),
            query("C", "SELECT 2", range(0, SIX_HOURS)),
        ];

        let responses = executor.execute_all(&queries).await;

        assert_eq!(responses.len(), 3);
        assert!(responses["A"].is_ok());
        assert!(responses["B"].is_err());
        assert!(responses["C"].is_ok());
        assert_eq!(runner.calls(), 3);
    }

    #[tokio::test]
    async fn test_purge_cache() {
        let (runner, executor) = executor(CacheConfig::new(100, 10));
        let q = query("A", "SELECT 1", range(0, SIX_HOURS));

        executor.execute(&q).await.unwrap();
        executor.purge_cache();
        assert_eq!(executor.cache_size(), 0);

        let response = executor.execute(&q).await.unwrap();
        assert!(!response.from_cache);
        assert_eq!(runner.calls(), 2);
    }
}
