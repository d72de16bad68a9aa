//! Time range covered by a query or a cached result

use crate::error::{QueryError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A closed `[from, to]` interval of instants.
///
/// Always satisfies `from <= to`; both the constructor and deserialization
/// reject inverted ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange")]
pub struct TimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawTimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = QueryError;

    fn try_from(raw: RawTimeRange) -> Result<Self> {
        TimeRange::new(raw.from, raw.to)
    }
}

impl TimeRange {
    /// Create a new time range, rejecting `from > to`
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self> {
        if from > to {
            return Err(QueryError::InvalidTimeRange {
                from: from.to_rfc3339(),
                to: to.to_rfc3339(),
            });
        }
        Ok(Self { from, to })
    }

    /// Range of `width` ending at `to`
    pub fn ending_at(to: DateTime<Utc>, width: Duration) -> Result<Self> {
        Self::new(to - width, to)
    }

    pub fn from(&self) -> DateTime<Utc> {
        self.from
    }

    pub fn to(&self) -> DateTime<Utc> {
        self.to
    }

    /// Width of the range in whole seconds (truncated)
    pub fn duration_seconds(&self) -> i64 {
        (self.to - self.from).num_seconds()
    }

    /// Move both bounds by the same offset
    pub fn shifted(&self, delta: Duration) -> Self {
        Self {
            from: self.from + delta,
            to: self.to + delta,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} .. {}]", self.from.to_rfc3339(), self.to.to_rfc3339())
    }
}
