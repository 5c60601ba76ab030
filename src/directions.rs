//! Route generation through an external directions provider.
//!
//! The provider only moves bytes: it receives a [`DirectionsRequest`] and
//! returns the raw JSON body. [`RouteGenerator`] owns the contract with the
//! payload, parsing distance, duration, the overall LineString and every
//! `legs[].steps[]` entry with the hints the surface classifier needs.
//!
//! Accepted payload (Mapbox/OSRM directions shape, first route is used):
//!
//! ```json
//! { "code": "Ok",
//!   "routes": [{ "distance": 1234.5, "duration": 321.0,
//!                "geometry": { "type": "LineString", "coordinates": [[lon, lat], ...] },
//!                "legs": [{ "steps": [{ "distance": 10.0, "name": "Main Street", "ref": "B1",
//!                                       "mode": "cycling",
//!                                       "geometry": { "type": "LineString", "coordinates": [...] },
//!                                       "maneuver": { "type": "turn", "modifier": "left" },
//!                                       "intersections": [{ "classes": ["tunnel"] }] }] }] }] }
//! ```
//!
//! Geometries may also arrive as precision-5 encoded polylines.

use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result, RouteError};
use crate::{polyline, GpsPoint, PathGeometry, TravelProfile};

const PROVIDER: &str = "directions";

// ============================================================================
// Provider contract
// ============================================================================

/// Ordered coordinates plus travel profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRequest {
    pub coordinates: Vec<GpsPoint>,
    pub profile: TravelProfile,
}

/// An external directions service.
///
/// Implementations return the response body of a successful call. Transport
/// failures and non-2xx statuses are reported as [`RouteError::Transport`]
/// and [`RouteError::HttpStatus`].
pub trait DirectionsProvider: Send + Sync {
    /// Name used in errors and log lines.
    fn name(&self) -> &str {
        PROVIDER
    }

    fn fetch_route<'a>(&'a self, request: &'a DirectionsRequest) -> BoxFuture<'a, Result<String>>;
}

// ============================================================================
// Parsed route
// ============================================================================

/// Maneuver hints of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Maneuver {
    #[serde(rename = "type")]
    pub kind: String,
    pub modifier: Option<String>,
}

/// Road-class tags attached to an intersection of a step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    #[serde(default)]
    pub classes: Vec<String>,
}

/// A single step of a leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub geometry: Vec<GpsPoint>,
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
    /// Travel mode of the step (e.g. "cycling", "ferry")
    pub mode: Option<String>,
    /// Step length in meters as reported by the provider
    pub distance_m: f64,
    pub maneuver: Maneuver,
    pub intersections: Vec<Intersection>,
}

impl RouteStep {
    /// All road-class tags of the step's intersections, in order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.intersections
            .iter()
            .flat_map(|i| i.classes.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub steps: Vec<RouteStep>,
}

/// The parsed provider response; the raw material of a generation cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRoute {
    pub geometry: PathGeometry,
    /// Meters
    pub distance_m: f64,
    /// Seconds
    pub duration_s: f64,
    pub legs: Vec<RouteLeg>,
}

impl GeneratedRoute {
    /// Steps of all legs in route order.
    pub fn steps(&self) -> impl Iterator<Item = &RouteStep> {
        self.legs.iter().flat_map(|l| l.steps.iter())
    }

    pub fn has_steps(&self) -> bool {
        self.legs.iter().any(|l| !l.steps.is_empty())
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireResponse {
    code: Option<String>,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<WireRoute>,
}

#[derive(Debug, Deserialize)]
struct WireRoute {
    distance: f64,
    duration: f64,
    geometry: WireGeometry,
    #[serde(default)]
    legs: Vec<WireLeg>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireGeometry {
    GeoJson {
        #[serde(rename = "type")]
        kind: String,
        coordinates: Vec<Vec<f64>>,
    },
    Encoded(String),
}

#[derive(Debug, Deserialize)]
struct WireLeg {
    #[serde(default)]
    steps: Vec<WireStep>,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    #[serde(default)]
    distance: f64,
    geometry: Option<WireGeometry>,
    #[serde(default)]
    name: String,
    #[serde(rename = "ref")]
    reference: Option<String>,
    mode: Option<String>,
    #[serde(default)]
    maneuver: Maneuver,
    #[serde(default)]
    intersections: Vec<Intersection>,
}

impl WireGeometry {
    fn into_points(self) -> Result<Vec<GpsPoint>> {
        match self {
            WireGeometry::GeoJson { kind, coordinates } => {
                if kind != "LineString" {
                    return Err(RouteError::malformed(
                        PROVIDER,
                        format!("expected LineString geometry, got {}", kind),
                    ));
                }
                coordinates
                    .into_iter()
                    .map(|c| match c.as_slice() {
                        [lng, lat, ..] => Ok(GpsPoint::new(*lat, *lng)),
                        _ => Err(RouteError::malformed(PROVIDER, "coordinate with fewer than 2 values")),
                    })
                    .collect()
            }
            WireGeometry::Encoded(encoded) => polyline::decode(&encoded).map_err(|e| {
                RouteError::malformed(PROVIDER, format!("bad encoded geometry: {}", e))
            }),
        }
    }
}

// ============================================================================
// Route Generator
// ============================================================================

/// Turns waypoints into a [`GeneratedRoute`] through a [`DirectionsProvider`].
///
/// Calls are never retried here; retry policy belongs to whoever wraps the
/// provider.
#[derive(Clone)]
pub struct RouteGenerator {
    provider: Arc<dyn DirectionsProvider>,
}

impl RouteGenerator {
    pub fn new(provider: Arc<dyn DirectionsProvider>) -> Self {
        Self { provider }
    }

    /// Request a route through the given waypoints.
    pub async fn generate(&self, request: &DirectionsRequest) -> Result<GeneratedRoute> {
        if request.coordinates.len() < 2 {
            return Err(RouteError::InsufficientWaypoints {
                count: request.coordinates.len(),
                minimum_required: 2,
            });
        }

        debug!(
            "[RouteGenerator] Requesting {} route through {} waypoints from {}",
            request.profile,
            request.coordinates.len(),
            self.provider.name()
        );

        let body = self.provider.fetch_route(request).await.map_err(|e| {
            warn!("[RouteGenerator] {} call failed: {}", self.provider.name(), e);
            e
        })?;

        let route = parse_response(&body)?;
        info!(
            "[RouteGenerator] Route: {:.0}m, {:.0}s, {} points, {} steps",
            route.distance_m,
            route.duration_s,
            route.geometry.len(),
            route.steps().count()
        );
        Ok(route)
    }
}

/// Parse a directions payload into a [`GeneratedRoute`].
///
/// Fails with [`RouteError::MalformedResponse`] on invalid JSON, a non-"Ok"
/// code, no routes, a non-finite distance or duration, or a route geometry
/// with fewer than two points.
pub fn parse_response(body: &str) -> Result<GeneratedRoute> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|e| RouteError::malformed(PROVIDER, format!("invalid JSON: {}", e)))?;

    if let Some(code) = wire.code.as_deref() {
        if !code.eq_ignore_ascii_case("ok") {
            let detail = wire.message.unwrap_or_default();
            return Err(RouteError::malformed(
                PROVIDER,
                format!("code {} {}", code, detail).trim_end().to_string(),
            ));
        }
    }

    let route = wire
        .routes
        .into_iter()
        .next()
        .ok_or_malformed(PROVIDER, "response contains no routes")?;

    if !route.distance.is_finite() || route.distance < 0.0 {
        return Err(RouteError::malformed(PROVIDER, "invalid route distance"));
    }
    if !route.duration.is_finite() || route.duration < 0.0 {
        return Err(RouteError::malformed(PROVIDER, "invalid route duration"));
    }

    let geometry = route.geometry.into_points()?;
    if geometry.len() < 2 {
        return Err(RouteError::malformed(
            PROVIDER,
            format!("route geometry has {} points", geometry.len()),
        ));
    }

    let legs = route
        .legs
        .into_iter()
        .map(|leg| {
            let steps = leg
                .steps
                .into_iter()
                .map(|s| {
                    Ok(RouteStep {
                        geometry: match s.geometry {
                            Some(g) => g.into_points()?,
                            None => Vec::new(),
                        },
                        name: s.name,
                        reference: s.reference.filter(|r| !r.trim().is_empty()),
                        mode: s.mode,
                        distance_m: s.distance,
                        maneuver: s.maneuver,
                        intersections: s.intersections,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RouteLeg { steps })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(GeneratedRoute {
        geometry: PathGeometry::new(geometry),
        distance_m: route.distance,
        duration_s: route.duration,
        legs,
    })
}
