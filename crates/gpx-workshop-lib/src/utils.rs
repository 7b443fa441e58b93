//! Utility functions for coordinate conversions and planar distances

use geo::Point;

/// Half the width of the EPSG:3857 world square, in meters
pub const MERCATOR_HALF_EXTENT: f64 = 20037508.34;

/// Latitude at which the Web Mercator square is cut off
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Mean Earth radius in meters, used by the haversine formula
pub const EARTH_RADIUS_M: f64 = 6371000.0;

/// Meters per degree of longitude along the Mercator x axis
const METERS_PER_DEGREE: f64 = MERCATOR_HALF_EXTENT / 180.0;

/// Project a WGS84 position onto the Web Mercator plane (meters)
///
/// Latitude is clamped to [`MAX_LATITUDE`] so polar input stays finite.
#[inline]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    // Isometric latitude, atanh(sin phi) == ln(tan(pi/4 + phi/2))
    let northing = phi.sin().atanh().to_degrees() * METERS_PER_DEGREE;
    Point::new(lon * METERS_PER_DEGREE, northing)
}

/// Inverse of [`wgs84_to_mercator`], returning `(lat, lon)` in degrees
#[inline]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let psi = (y / METERS_PER_DEGREE).to_radians();
    let lat = psi.sinh().atan().to_degrees();
    (lat, x / METERS_PER_DEGREE)
}

/// Planar distance from `p` to the closed line segment `a`-`b`
///
/// Projects `p` onto the segment and clamps the projection parameter to
/// `[0, 1]`; a degenerate segment (`a == b`) measures the distance to `a`.
#[inline]
pub fn point_segment_distance(p: Point<f64>, a: Point<f64>, b: Point<f64>) -> f64 {
    let dx = b.x() - a.x();
    let dy = b.y() - a.y();
    let length_sq = dx * dx + dy * dy;

    if length_sq == 0.0 {
        return (p.x() - a.x()).hypot(p.y() - a.y());
    }

    let t = (((p.x() - a.x()) * dx + (p.y() - a.y()) * dy) / length_sq).clamp(0.0, 1.0);
    let closest_x = a.x() + t * dx;
    let closest_y = a.y() + t * dy;
    (p.x() - closest_x).hypot(p.y() - closest_y)
}

/// Minimum planar distance from `p` to any edge of `polyline`
///
/// A single-vertex polyline measures the distance to that vertex. Returns
/// `f64::INFINITY` for an empty slice.
pub fn point_polyline_distance(p: Point<f64>, polyline: &[Point<f64>]) -> f64 {
    match polyline {
        [] => f64::INFINITY,
        [only] => (p.x() - only.x()).hypot(p.y() - only.y()),
        _ => polyline
            .windows(2)
            .map(|edge| point_segment_distance(p, edge[0], edge[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Haversine distance in meters between two WGS84 positions
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}
