//! FFI bindings for mobile platforms (iOS/Android).
//!
//! UniFFI exports over one global [`RoutePipeline`]. The pipeline is created
//! by [`route_configure`] (or [`route_configure_json`]) and driven from the
//! map screen; async pipeline calls run to completion on a shared tokio
//! runtime so every export is a plain blocking function for Kotlin/Swift.
//!
//! Structured results that UniFFI does not model (snapshot, notifications,
//! imported paths) cross the boundary as JSON strings.

use std::sync::{Arc, Mutex, PoisonError};

use log::{error, info, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::http::{MapboxDirectionsClient, OpenElevationClient, ProviderConfig};
use crate::{
    init_logging, polyline, EditMode, GpsPoint, ImportedPath, PipelineConfig, Result,
    RouteError, RoutePipeline, RouteStats, TravelProfile, Waypoint,
};

// ============================================================================
// Global State
// ============================================================================

static PIPELINE: Lazy<Mutex<Option<Arc<RoutePipeline>>>> = Lazy::new(|| Mutex::new(None));

static RUNTIME: Lazy<Option<Runtime>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(|e| error!("[RoutePlannerRust] Failed to create tokio runtime: {}", e))
        .ok()
});

fn current_pipeline() -> Option<Arc<RoutePipeline>> {
    let pipeline = PIPELINE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if pipeline.is_none() {
        warn!("[RoutePlannerRust] Pipeline used before route_configure");
    }
    pipeline
}

/// Run an async pipeline call to completion.
///
/// Returns `None` when the pipeline is not configured or no runtime exists.
fn with_pipeline<F, Fut, R>(f: F) -> Option<R>
where
    F: FnOnce(Arc<RoutePipeline>) -> Fut,
    Fut: std::future::Future<Output = R>,
{
    let pipeline = current_pipeline()?;
    let runtime = RUNTIME.as_ref()?;
    Some(runtime.block_on(f(pipeline)))
}

/// Combined configuration accepted by [`route_configure_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FfiConfig {
    provider: ProviderConfig,
    pipeline: PipelineConfig,
}

fn install(provider: &ProviderConfig, config: PipelineConfig) -> bool {
    let built = MapboxDirectionsClient::new(provider).and_then(|directions| {
        let elevation = OpenElevationClient::new(provider)?;
        RoutePipeline::new(config, Arc::new(directions), Arc::new(elevation))
    });
    match built {
        Ok(pipeline) => {
            *PIPELINE.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(pipeline));
            info!("[RoutePlannerRust] Pipeline configured");
            true
        }
        Err(e) => {
            error!("[RoutePlannerRust] Configuration rejected: {}", e);
            false
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Create the pipeline with default endpoints. Replaces any existing route.
#[uniffi::export]
pub fn route_configure(access_token: String, profile: TravelProfile) -> bool {
    init_logging();
    let provider = ProviderConfig {
        access_token,
        ..ProviderConfig::default()
    };
    let config = PipelineConfig {
        profile,
        ..PipelineConfig::default()
    };
    install(&provider, config)
}

/// Create the pipeline from JSON: `{"provider": {...}, "pipeline": {...}}`.
/// Missing fields take their defaults.
#[uniffi::export]
pub fn route_configure_json(config_json: String) -> bool {
    init_logging();
    match serde_json::from_str::<FfiConfig>(&config_json) {
        Ok(config) => install(&config.provider, config.pipeline),
        Err(e) => {
            error!("[RoutePlannerRust] Invalid configuration JSON: {}", e);
            false
        }
    }
}

// ============================================================================
// Waypoint Editing
// ============================================================================

fn logged<T>(result: Result<T>) -> Option<T> {
    result
        .map_err(|e| warn!("[RoutePlannerRust] {}", e))
        .ok()
}

/// Handle a tap on the map. Only the building mode adds a waypoint.
#[uniffi::export]
pub fn route_handle_map_click(mode: EditMode, latitude: f64, longitude: f64) -> Option<Waypoint> {
    let point = GpsPoint::new(latitude, longitude);
    with_pipeline(|p| async move { p.handle_map_click(mode, point).await })
        .and_then(logged)
        .flatten()
}

/// Returns `None` for invalid coordinates.
#[uniffi::export]
pub fn route_add_waypoint(latitude: f64, longitude: f64) -> Option<Waypoint> {
    let point = GpsPoint::new(latitude, longitude);
    with_pipeline(|p| async move { p.add_waypoint(point).await }).and_then(logged)
}

#[uniffi::export]
pub fn route_insert_waypoint(index: u32, latitude: f64, longitude: f64) -> Option<Waypoint> {
    let point = GpsPoint::new(latitude, longitude);
    with_pipeline(|p| async move { p.insert_waypoint(index as usize, point).await })
        .and_then(logged)
}

/// Drag a waypoint to new coordinates. Returns false for unknown ids or
/// invalid coordinates.
#[uniffi::export]
pub fn route_move_waypoint(id: String, latitude: f64, longitude: f64) -> bool {
    let point = GpsPoint::new(latitude, longitude);
    with_pipeline(|p| async move { p.move_waypoint(&id, point).await })
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

#[uniffi::export]
pub fn route_remove_waypoint(id: String) -> bool {
    with_pipeline(|p| async move { p.remove_waypoint(&id).await })
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

/// Pass `None` to restore the default name.
#[uniffi::export]
pub fn route_rename_waypoint(id: String, name: Option<String>) -> bool {
    current_pipeline()
        .map(|p| p.rename_waypoint(&id, name).is_ok())
        .unwrap_or(false)
}

#[uniffi::export]
pub fn route_select_waypoint(id: Option<String>) -> bool {
    current_pipeline()
        .map(|p| p.select_waypoint(id.as_deref()).is_ok())
        .unwrap_or(false)
}

#[uniffi::export]
pub fn route_clear() {
    if let Some(p) = current_pipeline() {
        p.clear();
        info!("[RoutePlannerRust] Route cleared");
    }
}

/// Re-run generation for the current waypoints (e.g. retry after a failure).
#[uniffi::export]
pub fn route_regenerate() -> bool {
    with_pipeline(|p| async move { p.regenerate().await })
        .map(|r| r.is_ok())
        .unwrap_or(false)
}

// ============================================================================
// Views
// ============================================================================

#[uniffi::export]
pub fn route_get_stats() -> RouteStats {
    current_pipeline()
        .map(|p| p.with_session(|s| s.stats().clone()))
        .unwrap_or_default()
}

#[uniffi::export]
pub fn route_get_waypoints() -> Vec<Waypoint> {
    current_pipeline()
        .map(|p| p.with_session(|s| s.waypoints().to_vec()))
        .unwrap_or_default()
}

/// Path as flat coordinates `[lat1, lng1, lat2, lng2, ...]`.
#[uniffi::export]
pub fn route_get_path_flat() -> Vec<f64> {
    current_pipeline()
        .map(|p| {
            p.with_session(|s| {
                s.path()
                    .iter()
                    .flat_map(|pt| [pt.latitude, pt.longitude])
                    .collect()
            })
        })
        .unwrap_or_default()
}

/// Full route state as JSON (waypoints, path, stats, surfaces, profile).
#[uniffi::export]
pub fn route_get_snapshot_json() -> String {
    current_pipeline()
        .map(|p| p.snapshot_json())
        .unwrap_or_else(|| "{}".to_string())
}

/// Pending user-facing messages as a JSON array; the queue is emptied.
#[uniffi::export]
pub fn route_drain_notifications_json() -> String {
    let notes = current_pipeline()
        .map(|p| p.drain_notifications())
        .unwrap_or_default();
    serde_json::to_string(&notes).unwrap_or_else(|_| "[]".to_string())
}

// ============================================================================
// Polyline Import
// ============================================================================

/// Decode an encoded polyline.
///
/// `None` on malformed input, so callers can tell it apart from an empty
/// polyline.
#[uniffi::export]
pub fn decode_polyline(encoded: String, precision: u32) -> Option<Vec<GpsPoint>> {
    init_logging();
    logged(polyline::decode_with_precision(&encoded, precision))
}

/// `None` when a point is invalid or the precision is out of range.
#[uniffi::export]
pub fn encode_polyline(points: Vec<GpsPoint>, precision: u32) -> Option<String> {
    logged(polyline::encode_with_precision(&points, precision))
}

/// Decode a precision-5 polyline into an imported path as JSON
/// (`points`, `centroid`, `bounds`, `lengthM`). `None` on failure.
#[uniffi::export]
pub fn import_polyline_json(encoded: String) -> Option<String> {
    init_logging();
    logged(ImportedPath::from_encoded(&encoded).and_then(|path| {
        serde_json::to_string(&path).map_err(|e| RouteError::Config {
            message: e.to_string(),
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_polyline_export() {
        let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@".to_string(), 5).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(decode_polyline(String::new(), 5), Some(Vec::new()));
    }

    #[test]
    fn test_malformed_polyline_is_none() {
        assert_eq!(decode_polyline("_p~iF~ps|U_".to_string(), 5), None);
        assert_eq!(decode_polyline("_p~iF~ps|U".to_string(), 12), None);
        assert_eq!(import_polyline_json("_p~iF~ps|U_".to_string()), None);
        assert_eq!(encode_polyline(vec![GpsPoint::new(f64::NAN, 7.0)], 5), None);
        assert_eq!(encode_polyline(Vec::new(), 5), Some(String::new()));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: FfiConfig =
            serde_json::from_str(r#"{"provider":{"accessToken":"pk.test"}}"#).unwrap();
        assert_eq!(config.provider.access_token, "pk.test");
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_import_json_fields() {
        let json = import_polyline_json("_p~iF~ps|U_ulLnnqC_mqNvxq`@".to_string()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["points"].as_array().unwrap().len(), 3);
        assert!(value["lengthM"].as_f64().unwrap() > 0.0);
    }
}
