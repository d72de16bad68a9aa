pub mod error;
pub mod time_range;

pub use error::{QueryError, Result};
pub use time_range::TimeRange;
