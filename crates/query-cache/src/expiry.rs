//! Resolution-aware staleness check for cached range results
//!
//! A cached result is only as precise as one data-point bucket of the query
//! that produced it. When a new request's boundaries drift from the cached
//! boundaries by no more than one bucket, re-running the query would not
//! produce a distinguishable result, so the cached entry is reused.

use chrono::{DateTime, Utc};
use query_core::TimeRange;
use tracing::debug;

/// Allowed boundary drift in seconds for the given resolution.
///
/// This is `duration_seconds / max_data_points` (floor division), capped at
/// `max_ttl_minutes * 60`. Returns `None` when `max_data_points <= 0`, in
/// which case no tolerance can be derived.
pub fn tolerance_seconds(
    max_data_points: i64,
    duration_seconds: i64,
    max_ttl_minutes: i64,
) -> Option<i64> {
    if max_data_points <= 0 {
        return None;
    }
    let seconds_per_bucket = duration_seconds.div_euclid(max_data_points);
    let ceiling = max_ttl_minutes.saturating_mul(60);
    Some(seconds_per_bucket.min(ceiling))
}

/// Whether a cached entry covering `cached` must be refetched to answer a
/// request for `requested`.
///
/// Stale when either boundary drifts by strictly more than the tolerance;
/// drift equal to the tolerance is still fresh. Invalid resolution
/// parameters always yield stale.
pub fn is_stale(
    cached: &TimeRange,
    requested: &TimeRange,
    max_ttl_minutes: i64,
    max_data_points: i64,
    duration_seconds: i64,
) -> bool {
    let Some(tolerance) = tolerance_seconds(max_data_points, duration_seconds, max_ttl_minutes)
    else {
        debug!(
            max_data_points,
            duration_seconds,
            "No bucket width for non-positive max data points, treating as stale"
        );
        return true;
    };

    let drift_to = drift_seconds(cached.to(), requested.to());
    let drift_from = drift_seconds(cached.from(), requested.from());

    debug!(
        cached = %cached,
        requested = %requested,
        drift_from,
        drift_to,
        seconds_per_bucket = tolerance,
        "Cache compare"
    );

    drift_to > tolerance || drift_from > tolerance
}

/// Absolute difference in whole seconds, truncated toward zero
fn drift_seconds(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (a - b).num_seconds().saturating_abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const SIX_HOURS: i64 = 36_000;

    fn range(from: i64, to: i64) -> TimeRange {
        TimeRange::new(
            Utc.timestamp_opt(from, 0).unwrap(),
            Utc.timestamp_opt(to, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_tolerance_is_bucket_width() {
        assert_eq!(tolerance_seconds(100, SIX_HOURS, 10), Some(360));
    }

    #[test]
    fn test_tolerance_clamped_by_ceiling() {
        assert_eq!(tolerance_seconds(100, SIX_HOURS, 1), Some(60));
        assert_eq!(tolerance_seconds(1, 86_400 * 30, 15), Some(900));
    }

    #[test]
    fn test_tolerance_floors_uneven_division() {
        // 1000 / 3 = 333.33..
        assert_eq!(tolerance_seconds(3, 1_000, 60), Some(333));
    }

    #[test]
    fn test_tolerance_rejects_non_positive_points() {
        assert_eq!(tolerance_seconds(0, SIX_HOURS, 10), None);
        assert_eq!(tolerance_seconds(-5, SIX_HOURS, 10), None);
    }

    #[test]
    fn test_identical_ranges_are_fresh() {
        let r = range(0, SIX_HOURS);
        assert!(!is_stale(&r, &r, 10, 100, SIX_HOURS));
        assert!(!is_stale(&r, &r, 1, 7, 13));
    }

    #[test]
    fn test_drift_within_bucket_is_fresh() {
        let cached = range(0, SIX_HOURS);
        let requested = range(0, SIX_HOURS + 300);
        assert!(!is_stale(&cached, &requested, 10, 100, SIX_HOURS));
    }

    #[test]
    fn test_drift_beyond_bucket_is_stale() {
        let cached = range(0, SIX_HOURS);
        let requested = range(0, SIX_HOURS + 400);
        assert!(is_stale(&cached, &requested, 10, 100, SIX_HOURS));
    }

    #[test]
    fn test_low_ceiling_makes_from_drift_stale() {
        let cached = range(1_000, SIX_HOURS);
        let requested = range(1_100, SIX_HOURS);

        assert!(!is_stale(&cached, &requested, 10, 100, SIX_HOURS));
        assert!(is_stale(&cached, &requested, 1, 100, SIX_HOURS));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let cached = range(0, SIX_HOURS);

        let at_tolerance = range(360, SIX_HOURS + 360);
        assert!(!is_stale(&cached, &at_tolerance, 10, 100, SIX_HOURS));

        let past_tolerance = range(361, SIX_HOURS + 361);
        assert!(is_stale(&cached, &past_tolerance, 10, 100, SIX_HOURS));
    }

    #[test]
    fn test_sub_second_drift_truncates() {
        let cached = range(0, SIX_HOURS);
        let requested = TimeRange::new(
            cached.from(),
            cached.to() + Duration::seconds(360) + Duration::milliseconds(999),
        )
        .unwrap();
        assert!(!is_stale(&cached, &requested, 10, 100, SIX_HOURS));
    }

    #[test]
    fn test_verdict_is_symmetric() {
        let a = range(0, SIX_HOURS);
        let pairs = [
            range(200, SIX_HOURS + 200),
            range(0, SIX_HOURS + 500),
            range(400, SIX_HOURS),
        ];
        for b in pairs {
            assert_eq!(
                is_stale(&a, &b, 10, 100, SIX_HOURS),
                is_stale(&b, &a, 10, 100, SIX_HOURS)
            );
        }
    }

    #[test]
    fn test_zero_max_data_points_is_always_stale() {
        let r = range(0, SIX_HOURS);
        assert!(is_stale(&r, &r, 10, 0, SIX_HOURS));
    }
}
