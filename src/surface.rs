//! Surface classification of route steps.
//!
//! Each step of the provider response is assigned a [`SurfaceType`] by a
//! fixed-priority cascade:
//!
//! 1. a ferry maneuver modifier (or ferry travel mode) gives `Ferry`
//! 2. if the step carries road-class tags: path/trail/cycleway gives `Path`,
//!    track/service gives `Unpaved`, trunk/primary/secondary gives `Paved`
//! 3. if it carries no class tags, the road name is matched instead:
//!    trail/path/cycleway gives `Path`, track/service/unpaved gives `Unpaved`,
//!    a road reference or street/highway/road gives `Paved`
//! 4. anything else is `Default`
//!
//! The step geometry is appended to the segment list of its type. Output is
//! deterministic for identical input, including with the `parallel` feature.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::directions::{GeneratedRoute, RouteStep};
use crate::geo_utils::polyline_length;
use crate::GpsPoint;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

const PATH_KEYWORDS: [&str; 3] = ["path", "trail", "cycleway"];
const UNPAVED_CLASS_KEYWORDS: [&str; 2] = ["track", "service"];
const PAVED_CLASS_KEYWORDS: [&str; 3] = ["trunk", "primary", "secondary"];
const UNPAVED_NAME_KEYWORDS: [&str; 3] = ["track", "service", "unpaved"];
const PAVED_NAME_KEYWORDS: [&str; 3] = ["street", "highway", "road"];

/// Inferred road/terrain type of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceType {
    Paved,
    Unpaved,
    Path,
    Ferry,
    Default,
}

impl SurfaceType {
    pub const ALL: [SurfaceType; 5] = [
        SurfaceType::Paved,
        SurfaceType::Unpaved,
        SurfaceType::Path,
        SurfaceType::Ferry,
        SurfaceType::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceType::Paved => "paved",
            SurfaceType::Unpaved => "unpaved",
            SurfaceType::Path => "path",
            SurfaceType::Ferry => "ferry",
            SurfaceType::Default => "default",
        }
    }
}

/// A labeled sub-portion of the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceSegment {
    #[serde(rename = "type")]
    pub surface_type: SurfaceType,
    pub coordinates: Vec<GpsPoint>,
    pub source_step_name: String,
    /// Meters
    pub distance: f64,
}

/// Segment lists per surface type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceBreakdown {
    pub paved: Vec<SurfaceSegment>,
    pub unpaved: Vec<SurfaceSegment>,
    pub path: Vec<SurfaceSegment>,
    pub ferry: Vec<SurfaceSegment>,
    #[serde(rename = "default")]
    pub unclassified: Vec<SurfaceSegment>,
}

impl SurfaceBreakdown {
    pub fn segments(&self, surface: SurfaceType) -> &[SurfaceSegment] {
        match surface {
            SurfaceType::Paved => &self.paved,
            SurfaceType::Unpaved => &self.unpaved,
            SurfaceType::Path => &self.path,
            SurfaceType::Ferry => &self.ferry,
            SurfaceType::Default => &self.unclassified,
        }
    }

    fn segments_mut(&mut self, surface: SurfaceType) -> &mut Vec<SurfaceSegment> {
        match surface {
            SurfaceType::Paved => &mut self.paved,
            SurfaceType::Unpaved => &mut self.unpaved,
            SurfaceType::Path => &mut self.path,
            SurfaceType::Ferry => &mut self.ferry,
            SurfaceType::Default => &mut self.unclassified,
        }
    }

    pub fn push(&mut self, segment: SurfaceSegment) {
        self.segments_mut(segment.surface_type).push(segment);
    }

    pub fn segment_count(&self) -> usize {
        SurfaceType::ALL.iter().map(|t| self.segments(*t).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segment_count() == 0
    }

    /// Total meters per surface type, in [`SurfaceType::ALL`] order.
    pub fn distance_by_type(&self) -> Vec<(SurfaceType, f64)> {
        SurfaceType::ALL
            .iter()
            .map(|t| (*t, self.segments(*t).iter().map(|s| s.distance).sum()))
            .collect()
    }

    /// Fraction (0..=1) of the classified distance with the given type.
    pub fn share(&self, surface: SurfaceType) -> f64 {
        let totals = self.distance_by_type();
        let total: f64 = totals.iter().map(|(_, d)| d).sum();
        if total <= 0.0 {
            return 0.0;
        }
        totals
            .iter()
            .find(|(t, _)| *t == surface)
            .map_or(0.0, |(_, d)| d / total)
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Assign a surface type to one step.
pub fn classify_step(step: &RouteStep) -> SurfaceType {
    let is_ferry = step
        .maneuver
        .modifier
        .as_deref()
        .is_some_and(|m| m.to_ascii_lowercase().contains("ferry"))
        || step
            .mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("ferry"));
    if is_ferry {
        return SurfaceType::Ferry;
    }

    let classes: Vec<String> = step.classes().map(str::to_ascii_lowercase).collect();
    if !classes.is_empty() {
        let matches = |keywords: &[&str]| classes.iter().any(|c| contains_any(c, keywords));
        if matches(&PATH_KEYWORDS) {
            return SurfaceType::Path;
        }
        if matches(&UNPAVED_CLASS_KEYWORDS) {
            return SurfaceType::Unpaved;
        }
        if matches(&PAVED_CLASS_KEYWORDS) {
            return SurfaceType::Paved;
        }
        return SurfaceType::Default;
    }

    let name = step.name.to_lowercase();
    if contains_any(&name, &PATH_KEYWORDS) {
        SurfaceType::Path
    } else if contains_any(&name, &UNPAVED_NAME_KEYWORDS) {
        SurfaceType::Unpaved
    } else if step.reference.is_some() || contains_any(&name, &PAVED_NAME_KEYWORDS) {
        SurfaceType::Paved
    } else {
        SurfaceType::Default
    }
}

/// Partitions a generated route into typed segments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceClassifier;

impl SurfaceClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify every step of the route.
    ///
    /// Steps with fewer than two coordinates have nothing to draw and are
    /// skipped. When the route carries no drawable step at all, the whole
    /// geometry becomes a single `Default` segment.
    pub fn classify(&self, route: &GeneratedRoute) -> SurfaceBreakdown {
        let steps: Vec<&RouteStep> = route.steps().filter(|s| s.geometry.len() >= 2).collect();

        if steps.is_empty() {
            let mut breakdown = SurfaceBreakdown::default();
            if route.geometry.len() >= 2 {
                let distance = if route.distance_m > 0.0 {
                    route.distance_m
                } else {
                    route.geometry.length_m()
                };
                breakdown.push(SurfaceSegment {
                    surface_type: SurfaceType::Default,
                    coordinates: route.geometry.points().to_vec(),
                    source_step_name: String::new(),
                    distance,
                });
            }
            debug!("[SurfaceClassifier] No step detail, whole path is default");
            return breakdown;
        }

        #[cfg(feature = "parallel")]
        let types: Vec<SurfaceType> = steps.par_iter().map(|s| classify_step(s)).collect();

        #[cfg(not(feature = "parallel"))]
        let types: Vec<SurfaceType> = steps.iter().map(|s| classify_step(s)).collect();

        let mut breakdown = SurfaceBreakdown::default();
        for (step, surface_type) in steps.into_iter().zip(types) {
            let distance = if step.distance_m > 0.0 {
                step.distance_m
            } else {
                polyline_length(&step.geometry)
            };
            breakdown.push(SurfaceSegment {
                surface_type,
                coordinates: step.geometry.clone(),
                source_step_name: step.name.clone(),
                distance,
            });
        }

        debug!(
            "[SurfaceClassifier] {} segments: {} paved, {} unpaved, {} path, {} ferry, {} default",
            breakdown.segment_count(),
            breakdown.paved.len(),
            breakdown.unpaved.len(),
            breakdown.path.len(),
            breakdown.ferry.len(),
            breakdown.unclassified.len()
        );
        breakdown
    }
}
