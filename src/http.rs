//! HTTP clients for the directions and elevation providers.
//!
//! - [`MapboxDirectionsClient`] speaks the Mapbox Directions v5 API (GeoJSON
//!   geometry, full overview, per-step detail)
//! - [`OpenElevationClient`] speaks the Open-Elevation batch lookup API
//!
//! Each call is a single attempt. Failures map to
//! [`RouteError::Transport`], [`RouteError::HttpStatus`] or
//! [`RouteError::MalformedResponse`] and are surfaced by the pipeline as
//! notifications; the next user edit issues a fresh request.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::directions::{DirectionsProvider, DirectionsRequest};
use crate::elevation::ElevationProvider;
use crate::error::{Result, RouteError};
use crate::GpsPoint;

const DIRECTIONS_PROVIDER: &str = "mapbox";
const ELEVATION_PROVIDER: &str = "open-elevation";

// Keep error bodies readable in logs and notifications
const MAX_ERROR_BODY: usize = 200;

/// Endpoints and credentials for the provider clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// Base URL of the directions API.
    /// Default: https://api.mapbox.com
    pub directions_base_url: String,

    /// Access token appended to every directions request.
    pub access_token: String,

    /// Base URL of the elevation API.
    /// Default: https://api.open-elevation.com
    pub elevation_base_url: String,

    /// Per-request timeout.
    /// Default: 30 seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            directions_base_url: "https://api.mapbox.com".to_string(),
            access_token: String::new(),
            elevation_base_url: "https://api.open-elevation.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<()> {
        for (label, url) in [
            ("directions", &self.directions_base_url),
            ("elevation", &self.elevation_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RouteError::Config {
                    message: format!("{} base URL must be http(s), got '{}'", label, url),
                });
            }
        }
        if self.access_token.trim().is_empty() {
            return Err(RouteError::Config {
                message: "directions access token is empty".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(RouteError::Config {
                message: "timeout must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }

    fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| RouteError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })
    }
}

fn transport(provider: &str, e: reqwest::Error) -> RouteError {
    RouteError::Transport {
        provider: provider.to_string(),
        message: e.to_string(),
    }
}

fn truncated(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((i, _)) => format!("{}...", &body[..i]),
        None => body.to_string(),
    }
}

/// Read the body of a response, turning non-2xx statuses into errors.
async fn read_body(provider: &str, resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| transport(provider, e))?;
    if !status.is_success() {
        warn!("[{}] HTTP {}: {}", provider, status, truncated(&body));
        return Err(RouteError::HttpStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: truncated(&body),
        });
    }
    Ok(body)
}

// ============================================================================
// Directions
// ============================================================================

/// Mapbox Directions v5 client.
pub struct MapboxDirectionsClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl MapboxDirectionsClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: config.client()?,
            base_url: config.directions_base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
        })
    }

    /// Request URL without the access token.
    pub fn route_url(&self, request: &DirectionsRequest) -> String {
        let coordinates = request
            .coordinates
            .iter()
            .map(|p| format!("{},{}", p.longitude, p.latitude))
            .collect::<Vec<_>>()
            .join(";");
        format!(
            "{}/directions/v5/mapbox/{}/{}?geometries=geojson&overview=full&steps=true",
            self.base_url, request.profile, coordinates
        )
    }
}

impl DirectionsProvider for MapboxDirectionsClient {
    fn name(&self) -> &str {
        DIRECTIONS_PROVIDER
    }

    fn fetch_route<'a>(&'a self, request: &'a DirectionsRequest) -> BoxFuture<'a, Result<String>> {
        async move {
            let url = self.route_url(request);
            debug!(
                "[MapboxDirections] Requesting {} route through {} waypoints",
                request.profile,
                request.coordinates.len()
            );

            let start = Instant::now();
            let resp = self
                .client
                .get(&url)
                .query(&[("access_token", self.access_token.as_str())])
                .send()
                .await
                .map_err(|e| transport(DIRECTIONS_PROVIDER, e))?;
            let body = read_body(DIRECTIONS_PROVIDER, resp).await?;

            info!(
                "[MapboxDirections] {} bytes in {:.2}s",
                body.len(),
                start.elapsed().as_secs_f64()
            );
            Ok(body)
        }
        .boxed()
    }
}

// ============================================================================
// Elevation
// ============================================================================

#[derive(Debug, Serialize)]
struct LookupRequest {
    locations: Vec<LookupLocation>,
}

#[derive(Debug, Serialize)]
struct LookupLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    elevation: f64,
}

/// Parse an Open-Elevation lookup body into elevations, in order.
pub fn parse_lookup_response(body: &str) -> Result<Vec<f64>> {
    let parsed: LookupResponse = serde_json::from_str(body)
        .map_err(|e| RouteError::malformed(ELEVATION_PROVIDER, e.to_string()))?;
    Ok(parsed.results.into_iter().map(|r| r.elevation).collect())
}

/// Open-Elevation batch lookup client.
pub struct OpenElevationClient {
    client: Client,
    base_url: String,
}

impl OpenElevationClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: config.client()?,
            base_url: config.elevation_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn lookup_url(&self) -> String {
        format!("{}/api/v1/lookup", self.base_url)
    }
}

impl ElevationProvider for OpenElevationClient {
    fn name(&self) -> &str {
        ELEVATION_PROVIDER
    }

    fn lookup<'a>(&'a self, points: &'a [GpsPoint]) -> BoxFuture<'a, Result<Vec<f64>>> {
        async move {
            let payload = LookupRequest {
                locations: points
                    .iter()
                    .map(|p| LookupLocation {
                        latitude: p.latitude,
                        longitude: p.longitude,
                    })
                    .collect(),
            };
            debug!("[OpenElevation] Looking up {} locations", points.len());

            let resp = self
                .client
                .post(self.lookup_url())
                .json(&payload)
                .send()
                .await
                .map_err(|e| transport(ELEVATION_PROVIDER, e))?;
            let body = read_body(ELEVATION_PROVIDER, resp).await?;
            parse_lookup_response(&body)
        }
        .boxed()
    }
}
