//! Timestamp assignment along a route.
//!
//! Timestamps are spaced evenly by point index, not by the geometric length of
//! each segment. Point density follows road geometry, so the speed implied
//! between two neighbouring points is not uniform; consumers that need real
//! velocities must derive them from segment lengths and the total duration.

use chrono::{Duration, NaiveDateTime};

/// Assign one timestamp per route point between `start` and `end`.
///
/// `t_i = start + (end - start) * i / (point_count - 1)`; a single point gets
/// `start`. An `end` earlier than `start` is treated as a zero-length span so
/// the result is always non-decreasing.
pub fn assign(start: NaiveDateTime, end: NaiveDateTime, point_count: usize) -> Vec<NaiveDateTime> {
    match point_count {
        0 => return Vec::new(),
        1 => return vec![start],
        _ => {}
    }

    let mut span_ms = (end - start).num_milliseconds();
    if span_ms < 0 {
        tracing::warn!(%start, %end, "trip ends before it starts; using a zero-length span");
        span_ms = 0;
    }

    let last = (point_count - 1) as i128;
    (0..point_count)
        .map(|i| {
            if i as i128 == last {
                return start + Duration::milliseconds(span_ms);
            }
            let offset = (span_ms as i128 * i as i128) / last;
            start + Duration::milliseconds(offset as i64)
        })
        .collect()
}
