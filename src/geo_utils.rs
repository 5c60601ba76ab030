//! # Geographic Utilities
//!
//! Distance, centroid and bounding-box primitives shared by every stage of
//! the route pipeline.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a path in meters |
//! | [`cumulative_distances`] | Running distance at every vertex of a path |
//! | [`compute_bounds`] | Bounding box of a path |
//! | [`compute_center`] | Centroid of a path |
//!
//! All functions expect WGS84 coordinates in degrees.

use geo::{Distance, Haversine, Point};

use crate::{Bounds, GpsPoint};

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns meters along a spherical Earth (mean radius 6,371 km).
///
/// # Example
///
/// ```rust
/// use route_planner::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0);
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Total length of a polyline in meters.
///
/// Empty or single-point paths return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Distance from the first point to every point of the path, in meters.
///
/// The output has the same length as the input; the first entry is always 0.
pub fn cumulative_distances(points: &[GpsPoint]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            total += haversine_distance(&points[i - 1], p);
        }
        out.push(total);
    }
    out
}

/// Bounding box of a set of points.
///
/// An empty input yields the degenerate box at (0, 0).
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    Bounds::from_points(points).unwrap_or_default()
}

/// Arithmetic centroid of a set of points.
///
/// An empty input yields (0, 0).
pub fn compute_center(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }

    let n = points.len() as f64;
    let (lat_sum, lng_sum) = points
        .iter()
        .fold((0.0, 0.0), |(lat, lng), p| (lat + p.latitude, lng + p.longitude));

    GpsPoint::new(lat_sum / n, lng_sum / n)
}
