//! Tests for the route pipeline: ordering of overlapping generations,
//! empty state, failure handling and snapping.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use route_planner::{
    CycleOutcome, DirectionsProvider, DirectionsRequest, EditMode, ElevationProvider, GpsPoint,
    NotificationLevel, PipelineConfig, Result, RouteError, RoutePipeline,
};
use tokio::sync::{mpsc, oneshot};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Directions body whose geometry is the requested coordinates with `extra`
/// points interpolated between each consecutive pair.
fn route_body(coordinates: &[GpsPoint], distance_m: f64, extra: usize) -> String {
    let mut line = Vec::new();
    for w in coordinates.windows(2) {
        for k in 0..=extra {
            let t = k as f64 / (extra + 1) as f64;
            line.push([
                w[0].longitude + (w[1].longitude - w[0].longitude) * t,
                w[0].latitude + (w[1].latitude - w[0].latitude) * t,
            ]);
        }
    }
    if let Some(last) = coordinates.last() {
        line.push(last.to_lng_lat());
    }
    serde_json::json!({
        "code": "Ok",
        "routes": [{
            "distance": distance_m,
            "duration": distance_m / 5.0,
            "geometry": { "type": "LineString", "coordinates": line },
            "legs": []
        }]
    })
    .to_string()
}

// ============================================================================
// Fake Providers
// ============================================================================

/// One outstanding directions call, answered by the test.
struct PendingCall {
    coordinates: Vec<GpsPoint>,
    respond: oneshot::Sender<Result<String>>,
}

impl PendingCall {
    fn succeed(self, distance_m: f64) {
        let body = route_body(&self.coordinates, distance_m, 0);
        let _ = self.respond.send(Ok(body));
    }
}

/// Hands every request to the test and waits for its answer.
struct ControlledDirections {
    calls: mpsc::UnboundedSender<PendingCall>,
}

impl ControlledDirections {
    fn new() -> (Self, mpsc::UnboundedReceiver<PendingCall>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { calls: tx }, rx)
    }
}

impl DirectionsProvider for ControlledDirections {
    fn fetch_route<'a>(&'a self, request: &'a DirectionsRequest) -> BoxFuture<'a, Result<String>> {
        async move {
            let (tx, rx) = oneshot::channel();
            let call = PendingCall {
                coordinates: request.coordinates.clone(),
                respond: tx,
            };
            let hung_up = || RouteError::Transport {
                provider: "directions".to_string(),
                message: "test harness hung up".to_string(),
            };
            self.calls.send(call).map_err(|_| hung_up())?;
            rx.await.map_err(|_| hung_up())?
        }
        .boxed()
    }
}

/// Answers from a script; counts calls.
struct ScriptedDirections {
    script: Mutex<VecDeque<Result<f64>>>,
    calls: AtomicUsize,
    /// Interpolated points between waypoints in the returned geometry
    extra: usize,
}

impl ScriptedDirections {
    fn new(script: Vec<Result<f64>>, extra: usize) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            extra,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectionsProvider for ScriptedDirections {
    fn fetch_route<'a>(&'a self, request: &'a DirectionsRequest) -> BoxFuture<'a, Result<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front().unwrap_or(Ok(1000.0));
        let result = next.map(|d| route_body(&request.coordinates, d, self.extra));
        async move { result }.boxed()
    }
}

/// Elevation rising 10m per sample.
struct Ramp;

impl ElevationProvider for Ramp {
    fn lookup<'a>(&'a self, points: &'a [GpsPoint]) -> BoxFuture<'a, Result<Vec<f64>>> {
        let out: Vec<f64> = (0..points.len()).map(|i| 500.0 + i as f64 * 10.0).collect();
        async move { Ok(out) }.boxed()
    }
}

struct ElevationDown;

impl ElevationProvider for ElevationDown {
    fn lookup<'a>(&'a self, _: &'a [GpsPoint]) -> BoxFuture<'a, Result<Vec<f64>>> {
        async move {
            Err(RouteError::HttpStatus {
                provider: "elevation".to_string(),
                status: 503,
                message: "unavailable".to_string(),
            })
        }
        .boxed()
    }
}

fn start() -> GpsPoint {
    GpsPoint::new(46.0, 7.0)
}

fn end() -> GpsPoint {
    GpsPoint::new(46.0, 7.02)
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_late_response_of_older_request_is_dropped() {
    init();
    let (directions, mut calls) = ControlledDirections::new();
    let pipeline = Arc::new(
        RoutePipeline::new(PipelineConfig::default(), Arc::new(directions), Arc::new(Ramp))
            .unwrap(),
    );
    let moved_id = pipeline.with_session(|s| {
        s.add_waypoint(start()).unwrap();
        s.add_waypoint(end()).unwrap().0.id
    });

    let p = Arc::clone(&pipeline);
    let first = tokio::spawn(async move { p.regenerate().await });
    let first_call = calls.recv().await.unwrap();

    // user drags the end point while the first request is in flight
    let dragged = GpsPoint::new(46.01, 7.03);
    pipeline
        .with_session(|s| s.move_waypoint(&moved_id, dragged))
        .unwrap();
    let p = Arc::clone(&pipeline);
    let second = tokio::spawn(async move { p.regenerate().await });
    let second_call = calls.recv().await.unwrap();
    assert_eq!(second_call.coordinates[1], dragged);

    // responses arrive in reverse order
    second_call.succeed(3000.0);
    let second = second.await.unwrap().unwrap();
    first_call.succeed(1500.0);
    let first = first.await.unwrap().unwrap();

    let latest = match second {
        CycleOutcome::Applied { sequence, .. } => sequence,
        other => panic!("expected applied, got {:?}", other),
    };
    match first {
        CycleOutcome::Stale { sequence, latest: l } => {
            assert!(sequence < latest);
            assert_eq!(l, latest);
        }
        other => panic!("expected stale, got {:?}", other),
    }

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.generation, Some(latest));
    assert_eq!(snapshot.stats.distance, 3.0);
    assert_eq!(snapshot.path.points().last(), Some(&dragged));
}

#[tokio::test]
async fn test_dropping_below_two_waypoints_invalidates_in_flight_request() {
    init();
    let (directions, mut calls) = ControlledDirections::new();
    let pipeline = Arc::new(
        RoutePipeline::new(PipelineConfig::default(), Arc::new(directions), Arc::new(Ramp))
            .unwrap(),
    );
    let removed_id = pipeline.with_session(|s| {
        s.add_waypoint(start()).unwrap();
        s.add_waypoint(end()).unwrap().0.id
    });

    let p = Arc::clone(&pipeline);
    let pending = tokio::spawn(async move { p.regenerate().await });
    let call = calls.recv().await.unwrap();

    pipeline.remove_waypoint(&removed_id).await.unwrap();
    call.succeed(2000.0);

    assert!(matches!(
        pending.await.unwrap().unwrap(),
        CycleOutcome::Stale { .. }
    ));
    let snapshot = pipeline.snapshot();
    assert!(snapshot.path.is_empty());
    assert_eq!(snapshot.stats.distance, 0.0);
    assert_eq!(snapshot.waypoints.len(), 1);
}

// ============================================================================
// Empty State and Failures
// ============================================================================

#[tokio::test]
async fn test_single_waypoint_stays_empty() {
    init();
    let directions = Arc::new(ScriptedDirections::new(vec![], 0));
    let pipeline =
        RoutePipeline::new(PipelineConfig::default(), directions.clone(), Arc::new(Ramp)).unwrap();

    let added = pipeline
        .handle_map_click(EditMode::Building, start())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(added.name.as_deref(), Some("Waypoint 1"));

    let snapshot = pipeline.snapshot();
    assert!(snapshot.path.is_empty());
    assert!(snapshot.surfaces.is_empty());
    assert!(snapshot.elevation_profile.is_empty());
    assert_eq!(snapshot.stats.waypoint_count, 0);
    assert_eq!(directions.calls(), 0);

    assert_eq!(pipeline.regenerate().await.unwrap(), CycleOutcome::Cleared);
    assert_eq!(directions.calls(), 0);
}

#[tokio::test]
async fn test_failure_keeps_previous_route() {
    init();
    let failure = RouteError::HttpStatus {
        provider: "directions".to_string(),
        status: 422,
        message: "InvalidInput".to_string(),
    };
    let directions = Arc::new(ScriptedDirections::new(vec![Ok(2500.0), Err(failure)], 0));
    let pipeline =
        RoutePipeline::new(PipelineConfig::default(), directions.clone(), Arc::new(Ramp)).unwrap();

    pipeline.add_waypoint(start()).await.unwrap();
    pipeline.add_waypoint(end()).await.unwrap();
    assert_eq!(pipeline.snapshot().stats.distance, 2.5);
    let before = pipeline.snapshot().path;

    // third waypoint triggers a generation that fails
    pipeline.add_waypoint(GpsPoint::new(46.01, 7.03)).await.unwrap();
    assert_eq!(directions.calls(), 2);

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.path, before);
    assert_eq!(snapshot.stats.distance, 2.5);
    assert_eq!(snapshot.waypoints.len(), 3);

    let notes = pipeline.drain_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Error);
    assert!(notes[0].message.contains("422"));
}

#[tokio::test]
async fn test_elevation_failure_still_commits_route() {
    init();
    let directions = Arc::new(ScriptedDirections::new(vec![Ok(1800.0)], 3));
    let pipeline =
        RoutePipeline::new(PipelineConfig::default(), directions, Arc::new(ElevationDown)).unwrap();
    pipeline.with_session(|s| {
        s.add_waypoint(start()).unwrap();
        s.add_waypoint(end()).unwrap();
    });

    let outcome = pipeline.regenerate().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Applied { .. }));

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.path.len(), 5);
    assert_eq!(snapshot.stats.distance, 1.8);
    assert!(snapshot.stats.elevation_gain.is_none());
    assert!(snapshot.stats.max_elevation.is_none());
    assert!(snapshot.elevation_profile.is_empty());

    let notes = pipeline.drain_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Warning);
}

#[tokio::test]
async fn test_elevation_stats_follow_the_path() {
    init();
    let directions = Arc::new(ScriptedDirections::new(vec![Ok(2000.0)], 8));
    let pipeline =
        RoutePipeline::new(PipelineConfig::default(), directions, Arc::new(Ramp)).unwrap();
    pipeline.add_waypoint(start()).await.unwrap();
    pipeline.add_waypoint(end()).await.unwrap();

    let snapshot = pipeline.snapshot();
    // 10 points, one elevation sample each, rising 10m per sample
    assert_eq!(snapshot.elevation_profile.len(), 10);
    assert_eq!(snapshot.stats.elevation_gain, Some(90.0));
    assert_eq!(snapshot.stats.elevation_loss, Some(0.0));
    assert_eq!(snapshot.stats.min_elevation, Some(500.0));
    assert_eq!(snapshot.stats.max_elevation, Some(590.0));
    assert_eq!(snapshot.stats.waypoint_count, 2);
    assert_eq!(snapshot.stats.duration, 2000.0 / 5.0 / 60.0);
}

// ============================================================================
// Snapping
// ============================================================================

/// Always returns the same straight path regardless of the waypoints.
struct FixedPath {
    calls: AtomicUsize,
}

impl FixedPath {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectionsProvider for FixedPath {
    fn fetch_route<'a>(&'a self, _: &'a DirectionsRequest) -> BoxFuture<'a, Result<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = route_body(&[start(), end()], 1550.0, 19);
        async move { Ok(body) }.boxed()
    }
}

#[tokio::test]
async fn test_interior_waypoint_snaps_once() {
    init();
    let directions = Arc::new(FixedPath {
        calls: AtomicUsize::new(0),
    });
    let pipeline =
        RoutePipeline::new(PipelineConfig::default(), directions.clone(), Arc::new(Ramp)).unwrap();

    let near = GpsPoint::new(46.0 + 40.0 / 111_195.0, 7.01);
    let far = GpsPoint::new(46.0 + 300.0 / 111_195.0, 7.015);
    pipeline.add_waypoint(start()).await.unwrap();
    pipeline.add_waypoint(near).await.unwrap();
    pipeline.add_waypoint(far).await.unwrap();
    pipeline.add_waypoint(end()).await.unwrap();
    assert_eq!(directions.calls(), 3);

    let snapshot = pipeline.snapshot();
    let path = snapshot.path.points();
    // endpoints untouched
    assert_eq!(snapshot.waypoints[0].coordinates, start());
    assert_eq!(snapshot.waypoints[3].coordinates, end());
    // near waypoint moved onto the vertex below it, far one left alone
    assert_eq!(snapshot.waypoints[1].coordinates, path[10]);
    assert_eq!(snapshot.waypoints[2].coordinates, far);

    // the snap write did not schedule another request
    assert_eq!(directions.calls(), 3);

    // a fresh cycle finds nothing left to snap
    let outcome = pipeline.regenerate().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Applied { snapped: 0, .. }));
}

#[tokio::test]
async fn test_snapping_disabled() {
    init();
    let directions = Arc::new(FixedPath {
        calls: AtomicUsize::new(0),
    });
    let config = PipelineConfig {
        snap_enabled: false,
        ..PipelineConfig::default()
    };
    let pipeline = RoutePipeline::new(config, directions, Arc::new(Ramp)).unwrap();
    let near = GpsPoint::new(46.0 + 40.0 / 111_195.0, 7.01);
    pipeline.with_session(|s| {
        s.add_waypoint(start()).unwrap();
        s.add_waypoint(near).unwrap();
        s.add_waypoint(end()).unwrap();
    });

    let outcome = pipeline.regenerate().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Applied { snapped: 0, .. }));
    assert_eq!(pipeline.snapshot().waypoints[1].coordinates, near);
}

#[tokio::test]
async fn test_snapshot_json_shape() {
    init();
    let directions = Arc::new(ScriptedDirections::new(vec![], 0));
    let pipeline =
        RoutePipeline::new(PipelineConfig::default(), directions, Arc::new(Ramp)).unwrap();
    pipeline.add_waypoint(start()).await.unwrap();
    pipeline.add_waypoint(end()).await.unwrap();
    pipeline.select_waypoint(Some("wp-1")).unwrap();

    let value: serde_json::Value = serde_json::from_str(&pipeline.snapshot_json()).unwrap();
    assert_eq!(value["selectedId"], "wp-1");
    assert_eq!(value["waypoints"].as_array().unwrap().len(), 2);
    assert_eq!(value["stats"]["waypointCount"], 2);
    assert!(value["surfaces"]["default"].is_array());
    assert!(value["elevationProfile"].is_array());
}
