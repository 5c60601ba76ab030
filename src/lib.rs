//! # Route Planner
//!
//! Route geometry processing for multi-point travel routes.
//!
//! This library turns an ordered set of user-placed waypoints into:
//! - A routable path from an external directions provider
//! - Waypoints snapped onto that path
//! - Surface-typed segments (paved, unpaved, path, ferry) for rendering
//! - An elevation profile with gain/loss statistics
//!
//! It also decodes encoded polylines for importing previously recorded paths.
//!
//! ## Features
//!
//! - **`http`** - reqwest clients for the directions and elevation providers
//! - **`parallel`** - Classify route steps with rayon
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_planner::{polyline, geo_utils};
//!
//! let path = polyline::decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//! assert_eq!(path.len(), 3);
//!
//! let length = geo_utils::polyline_length(&path);
//! println!("Imported path: {:.1} km", length / 1000.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, RouteError};

// Geographic utilities (distance, bounds, center calculations)
pub mod geo_utils;

// Encoded polyline codec and path import
pub mod polyline;
pub use polyline::ImportedPath;

// Ordered waypoint collection
pub mod waypoints;
pub use waypoints::{ChangeKind, ChangeOrigin, Followup, WaypointChange, WaypointStore};

// Directions provider contract and route generation
pub mod directions;
pub use directions::{
    DirectionsProvider, DirectionsRequest, GeneratedRoute, Intersection, Maneuver, RouteGenerator,
    RouteLeg, RouteStep,
};

// Snapping interior waypoints onto the generated path
pub mod snapping;
pub use snapping::{nearest_vertex, SnapEngine, SnapMove};

// Surface classification of route steps
pub mod surface;
pub use surface::{classify_step, SurfaceBreakdown, SurfaceClassifier, SurfaceSegment, SurfaceType};

// Elevation sampling and statistics
pub mod elevation;
pub use elevation::{ElevationAnalysis, ElevationAnalyzer, ElevationProvider, ElevationSummary};

// In-memory route session with staleness control
pub mod session;
pub use session::{
    CommitOutcome, GenerationCycle, GenerationRequest, Notification, NotificationLevel,
    RouteSession, RouteSnapshot,
};

// Async orchestration of the session and providers
pub mod pipeline;
pub use pipeline::{CycleOutcome, EditMode, RoutePipeline};

// Algorithm toolbox - standalone access to the pure algorithms
pub mod algorithms;

// HTTP provider clients
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{MapboxDirectionsClient, OpenElevationClient, ProviderConfig};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RoutePlannerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// Provider payloads and GeoJSON carry `[lon, lat]` pairs; use
/// [`GpsPoint::from_lng_lat`] and [`GpsPoint::to_lng_lat`] at those edges.
///
/// # Example
/// ```
/// use route_planner::GpsPoint;
/// let point = GpsPoint::from_lng_lat([-0.1278, 51.5074]); // London
/// assert_eq!(point.latitude, 51.5074);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Create a point from a GeoJSON-ordered `[lon, lat]` pair.
    pub fn from_lng_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }

    /// GeoJSON-ordered `[lon, lat]` pair.
    pub fn to_lng_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Reject NaN, infinite or out-of-range coordinates.
    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(RouteError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

/// Bounding box for a path.
///
/// The default value is the degenerate box at (0, 0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// A user-placed point defining route intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Waypoint {
    /// Opaque id, unique for the lifetime of the route
    pub id: String,
    pub coordinates: GpsPoint,
    pub name: Option<String>,
}

/// The provider-computed polyline connecting the waypoints in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathGeometry(pub Vec<GpsPoint>);

impl PathGeometry {
    pub fn new(points: Vec<GpsPoint>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Haversine length of the path in meters.
    pub fn length_m(&self) -> f64 {
        geo_utils::polyline_length(&self.0)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.0)
    }
}

/// Aggregate statistics for the most recently completed generation.
///
/// Recomputed wholesale on every committed cycle; the default value is the
/// empty state used when fewer than two waypoints exist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteStats {
    /// Route distance in kilometers
    pub distance: f64,
    /// Route duration in minutes
    pub duration: f64,
    pub waypoint_count: u32,
    /// Total climb in meters (None when elevation is unavailable)
    pub elevation_gain: Option<f64>,
    /// Total descent in meters
    pub elevation_loss: Option<f64>,
    pub max_elevation: Option<f64>,
    pub min_elevation: Option<f64>,
}

/// One sample of the elevation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationPoint {
    /// Along-path distance from the first sample, in meters
    pub distance_from_start: f64,
    /// Elevation in meters
    pub elevation: f64,
}

/// Travel mode requested from the directions provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TravelProfile {
    #[default]
    Cycling,
    Walking,
    Driving,
    DrivingTraffic,
}

impl TravelProfile {
    /// Profile name as used in provider request paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelProfile::Cycling => "cycling",
            TravelProfile::Walking => "walking",
            TravelProfile::Driving => "driving",
            TravelProfile::DrivingTraffic => "driving-traffic",
        }
    }
}

impl std::fmt::Display for TravelProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the route pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Travel profile sent to the directions provider.
    /// Default: cycling
    pub profile: TravelProfile,

    /// Interior waypoints closer than this to a path vertex are moved onto it.
    /// Default: 100.0 meters
    pub snap_threshold_m: f64,

    /// Maximum number of coordinates submitted to the elevation provider.
    /// Default: 100
    pub elevation_sample_cap: u32,

    /// Whether interior waypoints are snapped after each generation.
    /// Default: true
    pub snap_enabled: bool,

    /// Waypoint count at which a path is generated.
    /// Default: 2
    pub min_waypoints: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            profile: TravelProfile::Cycling,
            snap_threshold_m: 100.0,
            elevation_sample_cap: 100,
            snap_enabled: true,
            min_waypoints: 2,
        }
    }
}

impl PipelineConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !self.snap_threshold_m.is_finite() || self.snap_threshold_m < 0.0 {
            return Err(RouteError::Config {
                message: format!("snap threshold must be >= 0, got {}", self.snap_threshold_m),
            });
        }
        if self.elevation_sample_cap == 0 {
            return Err(RouteError::Config {
                message: "elevation sample cap must be at least 1".to_string(),
            });
        }
        if self.min_waypoints < 2 {
            return Err(RouteError::Config {
                message: format!("a route needs at least 2 waypoints, got {}", self.min_waypoints),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
