//! Range Query Caching Example
//!
//! Demonstrates how a sliding dashboard window reuses cached results while
//! the drift stays within one data-point bucket.
//!
//! Run with `RUST_LOG=query_cache=debug` to see each staleness decision.

use anyhow::Result;
use arrow::array::{Float64Array, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use query_cache::{tolerance_seconds, CacheConfig};
use query_core::TimeRange;
use query_executor::{DataSourceInstance, QueryRunner, RangeQuery};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Stands in for a remote warehouse: slow, and returns one row per bucket
struct SimulatedWarehouse;

#[async_trait]
impl QueryRunner for SimulatedWarehouse {
    async fn run(&self, query: &RangeQuery) -> query_core::Result<Vec<RecordBatch>> {
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;

        let points = query.max_data_points.max(1);
        let step = (query.time_range.duration_seconds() / points).max(1);
        let start = query.time_range.from().timestamp();

        let timestamps: Vec<i64> = (0..points).map(|i| start + i * step).collect();
        let values: Vec<f64> = (0..points).map(|i| (i as f64 * 0.1).sin()).collect();

        let schema = Arc::new(Schema::new(vec![
            Field::new("time", DataType::Timestamp(TimeUnit::Second, None), false),
            Field::new("value", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampSecondArray::from(timestamps)),
                Arc::new(Float64Array::from(values)),
            ],
        )?;
        Ok(vec![batch])
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    println!("=== Range Query Caching Example ===\n");

    let settings = br#"{
        "account": "demo",
        "warehouse": "COMPUTE_WH",
        "cacheEnabled": true,
        "cacheMaxEntries": 100,
        "cacheTtlMinutes": 10
    }"#;
    let instance = DataSourceInstance::from_settings(settings, SimulatedWarehouse)?;

    let sql = "SELECT time_bucket(time), avg(cpu) FROM host_metrics GROUP BY 1";
    let now = Utc::now();
    let window = TimeRange::ending_at(now, Duration::hours(10))?;

    let tolerance = tolerance_seconds(100, window.duration_seconds(), 10).unwrap_or(0);
    println!("10h window at 100 points -> tolerance {}s\n", tolerance);

    // Initial load
    run(&instance, "initial load", RangeQuery::new("A", sql, 100, window)).await?;

    // Dashboard refresh 2 minutes later: well inside one bucket
    let refresh = window.shifted(Duration::minutes(2));
    run(&instance, "refresh +2m", RangeQuery::new("A", sql, 100, refresh)).await?;

    // 8 minutes later: beyond one 6-minute bucket
    let later = window.shifted(Duration::minutes(8));
    run(&instance, "refresh +8m", RangeQuery::new("A", sql, 100, later)).await?;

    // Same window at a higher resolution is a different key
    run(&instance, "1000 points", RangeQuery::new("A", sql, 1000, later)).await?;

    let stats = instance.executor().cache_stats();
    println!("\nCache Statistics:");
    println!("  Hits:        {}", stats.hits());
    println!("  Misses:      {}", stats.misses());
    println!("  Stale:       {}", stats.stale());
    println!("  Evictions:   {}", stats.evictions());
    println!("  Entries:     {}", stats.entry_count());

    instance.dispose();
    println!("\nInstance disposed, {} entries left", instance.executor().cache_size());

    // A tiny cache to show eviction order
    let small = DataSourceInstance::with_config(CacheConfig::new(2, 10), SimulatedWarehouse);
    for table in ["cpu", "mem", "disk"] {
        let q = RangeQuery::new(table, format!("SELECT avg(v) FROM {}", table), 50, window);
        small.query(&q).await?;
    }
    println!(
        "\nCapacity 2 after three queries: {} entries, {} eviction(s)",
        small.executor().cache_size(),
        small.executor().cache_stats().evictions()
    );

    Ok(())
}

async fn run(instance: &DataSourceInstance<SimulatedWarehouse>, label: &str, query: RangeQuery) -> Result<()> {
    let started = std::time::Instant::now();
    let response = instance.query(&query).await?;
    let rows: usize = response.tables.iter().map(|batch| batch.num_rows()).sum();

    println!(
        "{:<14} {:>5} rows in {:>4}ms  {}",
        label,
        rows,
        started.elapsed().as_millis(),
        if response.from_cache { "(cache)" } else { "(executed)" }
    );
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "query_executor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
