//! External query execution boundary
//!
//! The cache never talks to a data source itself. Whatever actually runs a
//! query (a warehouse client, a remote service) is plugged in through
//! [`QueryRunner`].

use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use query_cache::CacheKey;
use query_core::{Result, TimeRange};
use std::sync::Arc;

/// A single query over a time range, as received from a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Caller-assigned identifier, unique within one batched request
    pub ref_id: String,
    /// Query text
    pub query: String,
    /// Maximum number of data points the caller wants back
    pub max_data_points: i64,
    /// Requested time range
    pub time_range: TimeRange,
}

impl RangeQuery {
    pub fn new(
        ref_id: impl Into<String>,
        query: impl Into<String>,
        max_data_points: i64,
        time_range: TimeRange,
    ) -> Self {
        Self {
            ref_id: ref_id.into(),
            query: query.into(),
            max_data_points,
            time_range,
        }
    }

    /// Cache key for this query's text and resolution
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_range(self.query.clone(), self.max_data_points, &self.time_range)
    }
}

/// Executes a query against the backing data source
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Run the query and return its result tables
    async fn run(&self, query: &RangeQuery) -> Result<Vec<RecordBatch>>;
}

#[async_trait]
impl<R: QueryRunner + ?Sized> QueryRunner for Arc<R> {
    async fn run(&self, query: &RangeQuery) -> Result<Vec<RecordBatch>> {
        (**self).run(query).await
    }
}
