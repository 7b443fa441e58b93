//! Immutable track segments with cached bounds and projected geometry

use crate::{DataError, Result, utils};
use geo::{Coord, Point, Rect};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Source of fresh segment identifiers, shared by every builder thread
static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a track segment
///
/// Identifiers are unique within the process and never reused, so two segments
/// with identical geometry remain distinct entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentId(u64);

impl SegmentId {
    /// Allocate a new identifier
    pub fn next() -> Self {
        Self(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment#{}", self.0)
    }
}

/// A single geographic position in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
        }
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }

    /// Web Mercator projection of this position
    #[inline]
    pub fn to_mercator(&self) -> Point<f64> {
        utils::wgs84_to_mercator(self.latitude, self.longitude)
    }
}

/// Latitude/longitude extent of a segment
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoBounds {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl GeoBounds {
    /// Smallest bounds covering both `self` and `other`
    pub fn union(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds {
            min_latitude: self.min_latitude.min(other.min_latitude),
            min_longitude: self.min_longitude.min(other.min_longitude),
            max_latitude: self.max_latitude.max(other.max_latitude),
            max_longitude: self.max_longitude.max(other.max_longitude),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_latitude + self.max_latitude) / 2.0,
            (self.min_longitude + self.max_longitude) / 2.0,
        )
    }
}

/// One continuous recorded path
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackSegment {
    id: SegmentId,
    /// Name of the enclosing track, if it had one
    name: Option<String>,
    points: Vec<GeoPoint>,
    /// Web Mercator coordinates of `points` (cached for distance queries)
    projected: Vec<Point<f64>>,
    bounds: GeoBounds,
    /// Bounding box in Web Mercator meters
    projected_bounds: Rect<f64>,
    /// Cached total length in meters
    length_meters: f64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl TrackSegment {
    /// Create a segment with a fresh identifier
    ///
    /// Bounds, projection and length are computed in a single pass over the
    /// points. Fails with [`DataError::EmptySegment`] when `points` is empty.
    pub fn new(points: Vec<GeoPoint>) -> Result<Self> {
        Self::with_id(SegmentId::next(), points)
    }

    /// Create a segment with an explicit identifier
    pub fn with_id(id: SegmentId, points: Vec<GeoPoint>) -> Result<Self> {
        let first = points.first().ok_or(DataError::EmptySegment)?;

        let mut bounds = GeoBounds {
            min_latitude: first.latitude,
            min_longitude: first.longitude,
            max_latitude: first.latitude,
            max_longitude: first.longitude,
        };
        let mut projected = Vec::with_capacity(points.len());
        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut length_meters = 0.0;
        let mut previous: Option<&GeoPoint> = None;

        for point in &points {
            bounds.min_latitude = bounds.min_latitude.min(point.latitude);
            bounds.min_longitude = bounds.min_longitude.min(point.longitude);
            bounds.max_latitude = bounds.max_latitude.max(point.latitude);
            bounds.max_longitude = bounds.max_longitude.max(point.longitude);

            let mercator = point.to_mercator();
            min_x = min_x.min(mercator.x());
            min_y = min_y.min(mercator.y());
            max_x = max_x.max(mercator.x());
            max_y = max_y.max(mercator.y());
            projected.push(mercator);

            if let Some(prev) = previous {
                length_meters += utils::haversine_distance(
                    prev.latitude,
                    prev.longitude,
                    point.latitude,
                    point.longitude,
                );
            }
            previous = Some(point);
        }

        let projected_bounds = Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y });

        Ok(Self {
            id,
            name: None,
            points,
            projected,
            bounds,
            projected_bounds,
            length_meters,
        })
    }

    /// Attach the enclosing track's name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Number of points (never zero)
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the segment has no points; false for every constructed segment
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    /// Bounding box in Web Mercator meters
    #[inline]
    pub fn projected_bounds(&self) -> Rect<f64> {
        self.projected_bounds
    }

    #[inline]
    pub fn projected_points(&self) -> &[Point<f64>] {
        &self.projected
    }

    /// Total length in meters (haversine)
    #[inline]
    pub fn length_meters(&self) -> f64 {
        self.length_meters
    }

    /// Whether the projected bounding box, grown by `margin` on both axes, contains `point`
    #[inline]
    pub fn bounds_contain(&self, point: Point<f64>, margin: f64) -> bool {
        let min = self.projected_bounds.min();
        let max = self.projected_bounds.max();
        point.x() >= min.x - margin
            && point.x() <= max.x + margin
            && point.y() >= min.y - margin
            && point.y() <= max.y + margin
    }

    /// Minimum planar distance from a projected `point` to any edge of this segment
    #[inline]
    pub fn distance_to(&self, point: Point<f64>) -> f64 {
        utils::point_polyline_distance(point, &self.projected)
    }
}
