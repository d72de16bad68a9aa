pub mod cached_executor;
pub mod instance;
pub mod runner;

pub use cached_executor::{CachedQueryExecutor, QueryResponse};
pub use instance::DataSourceInstance;
pub use runner::{QueryRunner, RangeQuery};
