//! Tests for geo_utils module

use route_planner::geo_utils::*;
use route_planner::GpsPoint;

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

#[test]
fn test_haversine_distance_same_point() {
    let p = GpsPoint::new(46.9480, 7.4474);
    assert_eq!(haversine_distance(&p, &p), 0.0);
}

#[test]
fn test_haversine_distance_known_value() {
    // Bern to Zurich is approximately 95 km
    let bern = GpsPoint::new(46.9480, 7.4474);
    let zurich = GpsPoint::new(47.3769, 8.5417);
    let dist = haversine_distance(&bern, &zurich);
    assert!(approx_eq(dist, 95_500.0, 2000.0));
}

#[test]
fn test_polyline_length_sums_segments() {
    let a = GpsPoint::new(46.0, 7.0);
    let b = GpsPoint::new(46.0, 7.01);
    let c = GpsPoint::new(46.01, 7.01);
    let total = polyline_length(&[a, b, c]);
    assert!(approx_eq(
        total,
        haversine_distance(&a, &b) + haversine_distance(&b, &c),
        1e-6
    ));
    assert_eq!(polyline_length(&[a]), 0.0);
    assert_eq!(polyline_length(&[]), 0.0);
}

#[test]
fn test_cumulative_distances() {
    let track: Vec<GpsPoint> = (0..4).map(|i| GpsPoint::new(46.0 + i as f64 * 0.001, 7.0)).collect();
    let cumulative = cumulative_distances(&track);
    assert_eq!(cumulative.len(), 4);
    assert_eq!(cumulative[0], 0.0);
    assert!(approx_eq(cumulative[3], polyline_length(&track), 1e-6));
    assert!(cumulative.windows(2).all(|w| w[1] > w[0]));
}

#[test]
fn test_compute_bounds_and_center() {
    let track = vec![
        GpsPoint::new(46.50, 7.10),
        GpsPoint::new(46.52, 7.12),
        GpsPoint::new(46.51, 7.11),
    ];
    let bounds = compute_bounds(&track);
    assert_eq!(bounds.min_lat, 46.50);
    assert_eq!(bounds.max_lat, 46.52);
    assert_eq!(bounds.min_lng, 7.10);
    assert_eq!(bounds.max_lng, 7.12);

    let center = compute_center(&track);
    assert!(approx_eq(center.latitude, 46.51, 1e-9));
    assert!(approx_eq(center.longitude, 7.11, 1e-9));
}

#[test]
fn test_compute_center_empty() {
    let center = compute_center(&[]);
    assert_eq!(center.latitude, 0.0);
    assert_eq!(center.longitude, 0.0);
}
