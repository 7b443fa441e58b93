//! Nearest-segment hit testing over projected polylines

use crate::segment::{SegmentId, TrackSegment};
use geo::Point;

/// Find the segment closest to `point` within `tolerance`
///
/// # Arguments
/// * `segments` - Candidates in iteration order; ties resolve to the earliest
/// * `point` - Query position in Web Mercator meters
/// * `tolerance` - Maximum accepted distance in Web Mercator meters
///
/// A candidate is measured only when its bounding box, grown by `tolerance`,
/// contains `point`. Distances are taken against every edge of the polyline,
/// and a result is always strictly closer than `tolerance`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn closest<'a>(
    segments: impl IntoIterator<Item = &'a TrackSegment>,
    point: Point<f64>,
    tolerance: f64,
) -> Option<SegmentId> {
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return None;
    }

    let mut best: Option<(SegmentId, f64)> = None;

    for segment in segments {
        if !segment.bounds_contain(point, tolerance) {
            continue;
        }

        let distance = segment.distance_to(point);
        let best_distance = best.map_or(f64::INFINITY, |(_, d)| d);
        if distance < best_distance && distance < tolerance {
            best = Some((segment.id(), distance));
        }
    }

    best.map(|(id, _)| id)
}
