//! Elevation profile and statistics.
//!
//! The path is downsampled with a fixed stride so the lookup stays within the
//! provider's query-size limit, the samples are sent to an
//! [`ElevationProvider`], and the answers are paired with cumulative
//! haversine distance along the sampled points.

use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteError};
use crate::geo_utils::cumulative_distances;
use crate::{ElevationPoint, GpsPoint};

/// Default maximum number of coordinates per lookup.
pub const DEFAULT_SAMPLE_CAP: usize = 100;

/// An external elevation lookup.
///
/// Must return exactly one elevation in meters per input point, in order.
pub trait ElevationProvider: Send + Sync {
    /// Name used in errors and log lines.
    fn name(&self) -> &str {
        "elevation"
    }

    fn lookup<'a>(&'a self, points: &'a [GpsPoint]) -> BoxFuture<'a, Result<Vec<f64>>>;
}

/// Aggregate statistics over an elevation profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationSummary {
    /// Sum of positive deltas, meters
    pub gain: f64,
    /// Sum of absolute negative deltas, meters
    pub loss: f64,
    pub max: f64,
    pub min: f64,
}

/// Profile plus summary for one path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationAnalysis {
    pub profile: Vec<ElevationPoint>,
    pub summary: ElevationSummary,
}

/// Pick at most `cap` evenly strided points.
///
/// `stride = max(1, floor(len / cap))`; points at multiples of the stride
/// are kept, truncated to `cap`.
pub fn sample_path(points: &[GpsPoint], cap: usize) -> Vec<GpsPoint> {
    let cap = cap.max(1);
    let stride = (points.len() / cap).max(1);
    points.iter().step_by(stride).take(cap).copied().collect()
}

/// Pair sampled points with their elevations.
pub fn build_profile(samples: &[GpsPoint], elevations: &[f64]) -> Vec<ElevationPoint> {
    cumulative_distances(samples)
        .into_iter()
        .zip(elevations)
        .map(|(distance_from_start, &elevation)| ElevationPoint {
            distance_from_start,
            elevation,
        })
        .collect()
}

/// Extrema and cumulative gain/loss of a profile.
///
/// An empty profile gives all zeros; a single point gives max = min = its
/// elevation with no gain or loss.
pub fn summarize(profile: &[ElevationPoint]) -> ElevationSummary {
    let Some(first) = profile.first() else {
        return ElevationSummary::default();
    };

    let mut summary = ElevationSummary {
        gain: 0.0,
        loss: 0.0,
        max: first.elevation,
        min: first.elevation,
    };

    for w in profile.windows(2) {
        let delta = w[1].elevation - w[0].elevation;
        if delta > 0.0 {
            summary.gain += delta;
        } else {
            summary.loss += -delta;
        }
        summary.max = summary.max.max(w[1].elevation);
        summary.min = summary.min.min(w[1].elevation);
    }

    summary
}

/// Samples a path and queries its elevation.
#[derive(Clone)]
pub struct ElevationAnalyzer {
    provider: Arc<dyn ElevationProvider>,
    sample_cap: usize,
}

impl ElevationAnalyzer {
    pub fn new(provider: Arc<dyn ElevationProvider>) -> Self {
        Self::with_sample_cap(provider, DEFAULT_SAMPLE_CAP)
    }

    pub fn with_sample_cap(provider: Arc<dyn ElevationProvider>, sample_cap: usize) -> Self {
        Self {
            provider,
            sample_cap: sample_cap.max(1),
        }
    }

    /// Build the elevation profile of a path.
    ///
    /// An empty path yields an empty analysis without calling the provider.
    /// A provider answer whose length differs from the number of samples, or
    /// that contains non-finite values, is a malformed response.
    pub async fn analyze(&self, path: &[GpsPoint]) -> Result<ElevationAnalysis> {
        if path.is_empty() {
            return Ok(ElevationAnalysis::default());
        }

        let samples = sample_path(path, self.sample_cap);
        debug!(
            "[ElevationAnalyzer] Looking up {} of {} path points",
            samples.len(),
            path.len()
        );

        let elevations = self.provider.lookup(&samples).await.map_err(|e| {
            warn!("[ElevationAnalyzer] {} lookup failed: {}", self.provider.name(), e);
            e
        })?;

        if elevations.len() != samples.len() {
            return Err(RouteError::malformed(
                self.provider.name(),
                format!(
                    "expected {} elevations, got {}",
                    samples.len(),
                    elevations.len()
                ),
            ));
        }
        if elevations.iter().any(|e| !e.is_finite()) {
            return Err(RouteError::malformed(
                self.provider.name(),
                "non-finite elevation value",
            ));
        }

        let profile = build_profile(&samples, &elevations);
        let summary = summarize(&profile);
        debug!(
            "[ElevationAnalyzer] gain {:.0}m, loss {:.0}m, range {:.0}..{:.0}m",
            summary.gain, summary.loss, summary.min, summary.max
        );

        Ok(ElevationAnalysis { profile, summary })
    }
}
