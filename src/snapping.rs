//! Snapping interior waypoints onto the generated path.
//!
//! The first and last waypoints define route intent and are never touched.
//! Every interior waypoint is compared against all path vertices; when the
//! nearest vertex is closer than the threshold the waypoint moves onto it.
//! A linear scan is enough at the point counts a directions provider returns.

use log::debug;

use crate::geo_utils::haversine_distance;
use crate::{GpsPoint, Waypoint};

/// Default snap radius in meters.
pub const DEFAULT_SNAP_THRESHOLD_M: f64 = 100.0;

/// A waypoint relocation computed by a snap pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapMove {
    pub waypoint_id: String,
    pub from: GpsPoint,
    pub to: GpsPoint,
    /// Distance between `from` and `to` in meters
    pub distance_m: f64,
}

/// Index and distance (meters) of the path vertex nearest to `point`.
///
/// Ties keep the earliest vertex. Returns `None` for an empty path.
pub fn nearest_vertex(point: &GpsPoint, path: &[GpsPoint]) -> Option<(usize, f64)> {
    path.iter()
        .enumerate()
        .map(|(i, v)| (i, haversine_distance(point, v)))
        .fold(None, |best, (i, d)| match best {
            Some((_, best_d)) if best_d <= d => best,
            _ => Some((i, d)),
        })
}

/// Computes snap moves for interior waypoints.
#[derive(Debug, Clone, Copy)]
pub struct SnapEngine {
    threshold_m: f64,
}

impl Default for SnapEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SNAP_THRESHOLD_M)
    }
}

impl SnapEngine {
    pub fn new(threshold_m: f64) -> Self {
        Self { threshold_m }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// Moves for every interior waypoint strictly closer than the threshold
    /// to a path vertex. Waypoints already sitting on their vertex produce no
    /// move.
    pub fn compute_moves(&self, path: &[GpsPoint], waypoints: &[Waypoint]) -> Vec<SnapMove> {
        if waypoints.len() < 3 || path.is_empty() {
            return Vec::new();
        }

        let interior = &waypoints[1..waypoints.len() - 1];
        let moves: Vec<SnapMove> = interior
            .iter()
            .filter_map(|w| {
                let (index, distance_m) = nearest_vertex(&w.coordinates, path)?;
                if distance_m >= self.threshold_m {
                    return None;
                }
                let to = path[index];
                if to == w.coordinates {
                    return None;
                }
                Some(SnapMove {
                    waypoint_id: w.id.clone(),
                    from: w.coordinates,
                    to,
                    distance_m,
                })
            })
            .collect();

        debug!(
            "[SnapEngine] {} of {} interior waypoints within {:.0}m of the path",
            moves.len(),
            interior.len(),
            self.threshold_m
        );
        moves
    }
}
