//! # Route Session
//!
//! The in-memory state of one route being built: the waypoint store and the
//! derived data of the most recently completed generation cycle.
//!
//! ## Ordering
//!
//! Every generation is tagged with a sequence number taken from a counter
//! that only moves forward. A cycle is committed only if its sequence is the
//! latest one issued; anything older is dropped unprocessed, so responses
//! are applied in issuance order no matter when they arrive. Clearing the
//! derived state (fewer than two waypoints) also advances the counter, which
//! turns every in-flight request stale.
//!
//! ## Snapping
//!
//! After a commit the session may snap interior waypoints onto the new path
//! once. The write is tagged with the generation it came from and does not
//! schedule a regeneration. A snap is refused when the generation is no
//! longer current, was already snapped, or the user edited the waypoints
//! after the request was built.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::directions::{DirectionsRequest, GeneratedRoute};
use crate::elevation::ElevationAnalysis;
use crate::error::{Result, RouteError};
use crate::snapping::SnapEngine;
use crate::surface::SurfaceBreakdown;
use crate::waypoints::{ChangeKind, Followup, WaypointChange, WaypointStore};
use crate::{ElevationPoint, GpsPoint, PathGeometry, PipelineConfig, RouteStats, Waypoint};

// ============================================================================
// Cycle Types
// ============================================================================

/// A directions request tagged for staleness control.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub sequence: u64,
    /// Waypoint revision the request was built from
    pub revision: u64,
    pub directions: DirectionsRequest,
}

/// Everything one successful generation produced, committed as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationCycle {
    pub sequence: u64,
    pub revision: u64,
    pub waypoint_count: u32,
    pub route: GeneratedRoute,
    pub surfaces: SurfaceBreakdown,
    /// None when the elevation lookup failed
    pub elevation: Option<ElevationAnalysis>,
}

impl GenerationCycle {
    pub fn new(
        request: &GenerationRequest,
        route: GeneratedRoute,
        surfaces: SurfaceBreakdown,
        elevation: Option<ElevationAnalysis>,
    ) -> Self {
        Self {
            sequence: request.sequence,
            revision: request.revision,
            waypoint_count: request.directions.coordinates.len() as u32,
            route,
            surfaces,
            elevation,
        }
    }

    /// Stats derived wholesale from this cycle.
    pub fn stats(&self) -> RouteStats {
        let summary = self.elevation.as_ref().map(|e| e.summary);
        RouteStats {
            distance: self.route.distance_m / 1000.0,
            duration: self.route.duration_s / 60.0,
            waypoint_count: self.waypoint_count,
            elevation_gain: summary.map(|s| s.gain),
            elevation_loss: summary.map(|s| s.loss),
            max_elevation: summary.map(|s| s.max),
            min_elevation: summary.map(|s| s.min),
        }
    }
}

/// Result of offering a cycle to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied { sequence: u64 },
    /// A newer request was issued; the cycle was discarded
    Stale { sequence: u64, latest: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Warning,
    Error,
}

/// A user-facing message produced by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub sequence: u64,
    pub level: NotificationLevel,
    pub message: String,
}

/// Read-only view of the session after the latest completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSnapshot {
    /// Sequence of the committed cycle, None when there is no path
    pub generation: Option<u64>,
    pub waypoints: Vec<Waypoint>,
    pub selected_id: Option<String>,
    pub path: PathGeometry,
    pub stats: RouteStats,
    pub surfaces: SurfaceBreakdown,
    pub elevation_profile: Vec<ElevationPoint>,
}

// ============================================================================
// Route Session
// ============================================================================

/// Waypoints plus the derived state of the latest committed cycle.
#[derive(Debug, Clone)]
pub struct RouteSession {
    config: PipelineConfig,
    store: WaypointStore,
    snap_engine: SnapEngine,

    // Staleness control
    latest_issued: u64,
    revision: u64,

    // Derived state, replaced wholesale
    current: Option<GenerationCycle>,
    stats: RouteStats,
    snapped_generation: Option<u64>,

    notifications: Vec<Notification>,
}

impl Default for RouteSession {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl RouteSession {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            snap_engine: SnapEngine::new(config.snap_threshold_m),
            config,
            store: WaypointStore::new(),
            latest_issued: 0,
            revision: 0,
            current: None,
            stats: RouteStats::default(),
            snapped_generation: None,
            notifications: Vec::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        self.store.waypoints()
    }

    // ========================================================================
    // Waypoint Edits
    // ========================================================================

    pub fn add_waypoint(&mut self, coordinates: GpsPoint) -> Result<(Waypoint, Followup)> {
        let (waypoint, change) = self.store.add(coordinates)?;
        Ok((waypoint, self.after_change(change)))
    }

    pub fn insert_waypoint(
        &mut self,
        index: usize,
        coordinates: GpsPoint,
    ) -> Result<(Waypoint, Followup)> {
        let (waypoint, change) = self.store.insert(index, coordinates)?;
        Ok((waypoint, self.after_change(change)))
    }

    pub fn remove_waypoint(&mut self, id: &str) -> Result<Followup> {
        let change = self.store.remove(id)?;
        Ok(self.after_change(change))
    }

    pub fn move_waypoint(&mut self, id: &str, coordinates: GpsPoint) -> Result<Followup> {
        let change = self.store.move_to(id, coordinates)?;
        Ok(self.after_change(change))
    }

    pub fn rename_waypoint(&mut self, id: &str, name: Option<String>) -> Result<Followup> {
        let change = self.store.rename(id, name)?;
        Ok(self.after_change(change))
    }

    pub fn select_waypoint(&mut self, id: Option<&str>) -> Result<()> {
        self.store.select(id)
    }

    pub fn clear_waypoints(&mut self) -> Followup {
        let change = self.store.clear();
        self.after_change(change)
    }

    /// Route a store change to its followup. User edits that touch the
    /// sequence bump the revision; dropping below the minimum clears the
    /// derived state right away.
    fn after_change(&mut self, change: WaypointChange) -> Followup {
        let followup = change.followup(self.config.min_waypoints as usize);
        if followup != Followup::Nothing {
            self.revision += 1;
        }
        debug!(
            "[RouteSession] {:?} ({:?}) -> {:?}, {} waypoints",
            change.kind, change.origin, followup, change.count
        );
        if followup == Followup::ClearDerived {
            self.clear_derived();
        }
        followup
    }

    /// Drop path, stats and analyses, and make every in-flight request stale.
    pub fn clear_derived(&mut self) {
        self.latest_issued += 1;
        self.current = None;
        self.stats = RouteStats::default();
        self.snapped_generation = None;
        debug!(
            "[RouteSession] Derived state cleared (sequence now {})",
            self.latest_issued
        );
    }

    // ========================================================================
    // Generation Cycle
    // ========================================================================

    /// Issue the next generation request, or clear the derived state when
    /// there are too few waypoints.
    pub fn begin_generation(&mut self) -> Option<GenerationRequest> {
        if self.store.len() < self.config.min_waypoints as usize {
            self.clear_derived();
            return None;
        }

        self.latest_issued += 1;
        debug!(
            "[RouteSession] Issued generation {} for {} waypoints",
            self.latest_issued,
            self.store.len()
        );
        Some(GenerationRequest {
            sequence: self.latest_issued,
            revision: self.revision,
            directions: DirectionsRequest {
                coordinates: self.store.coordinates(),
                profile: self.config.profile,
            },
        })
    }

    pub fn latest_issued(&self) -> u64 {
        self.latest_issued
    }

    pub fn is_current(&self, sequence: u64) -> bool {
        sequence == self.latest_issued
    }

    /// Offer a completed cycle. Only the latest issued sequence is applied.
    pub fn commit(&mut self, cycle: GenerationCycle) -> CommitOutcome {
        if !self.is_current(cycle.sequence) {
            warn!(
                "[RouteSession] Discarding stale generation {} (latest {})",
                cycle.sequence, self.latest_issued
            );
            return CommitOutcome::Stale {
                sequence: cycle.sequence,
                latest: self.latest_issued,
            };
        }

        let sequence = cycle.sequence;
        self.stats = cycle.stats();
        info!(
            "[RouteSession] Applied generation {}: {:.2} km, {:.0} min, {} path points",
            sequence,
            self.stats.distance,
            self.stats.duration,
            cycle.route.geometry.len()
        );
        self.current = Some(cycle);
        self.snapped_generation = None;
        CommitOutcome::Applied { sequence }
    }

    /// Record a failed generation. Prior state is left untouched; failures of
    /// superseded requests are ignored. Returns whether the failure was current.
    pub fn record_failure(&mut self, sequence: u64, error: &RouteError) -> bool {
        if !self.is_current(sequence) {
            debug!(
                "[RouteSession] Ignoring failure of stale generation {}: {}",
                sequence, error
            );
            return false;
        }
        warn!("[RouteSession] Generation {} failed: {}", sequence, error);
        self.notify(sequence, NotificationLevel::Error, format!("Could not build route: {}", error));
        true
    }

    /// Record a non-fatal problem of the current generation.
    pub fn record_warning(&mut self, sequence: u64, message: impl Into<String>) -> bool {
        if !self.is_current(sequence) {
            return false;
        }
        self.notify(sequence, NotificationLevel::Warning, message.into());
        true
    }

    fn notify(&mut self, sequence: u64, level: NotificationLevel, message: String) {
        self.notifications.push(Notification {
            sequence,
            level,
            message,
        });
    }

    /// Take all pending notifications.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    // ========================================================================
    // Snapping
    // ========================================================================

    /// Snap interior waypoints onto the path of `generation`.
    ///
    /// Returns the snap-tagged change, or None when the snap is refused or
    /// disabled. A pass that finds nothing to move still counts as done.
    pub fn snap(&mut self, generation: u64) -> Option<WaypointChange> {
        if !self.config.snap_enabled {
            return None;
        }
        let cycle = self.current.as_ref()?;
        if cycle.sequence != generation || !self.is_current(generation) {
            debug!("[SnapEngine] Generation {} is no longer current", generation);
            return None;
        }
        if self.snapped_generation == Some(generation) {
            debug!("[SnapEngine] Generation {} already snapped", generation);
            return None;
        }
        if cycle.revision != self.revision {
            debug!(
                "[SnapEngine] Waypoints edited since generation {} was requested",
                generation
            );
            return None;
        }

        let moves = self
            .snap_engine
            .compute_moves(cycle.route.geometry.points(), self.store.waypoints());
        self.snapped_generation = Some(generation);

        let batch: Vec<(String, GpsPoint)> =
            moves.into_iter().map(|m| (m.waypoint_id, m.to)).collect();
        let change = self.store.apply_snapped(generation, &batch);
        if let ChangeKind::Snapped(ids) = &change.kind {
            if !ids.is_empty() {
                info!(
                    "[SnapEngine] Snapped {} waypoints onto generation {}",
                    ids.len(),
                    generation
                );
            }
        }
        // snap-originated: never a regeneration
        debug_assert_eq!(
            change.followup(self.config.min_waypoints as usize),
            Followup::Nothing
        );
        Some(change)
    }

    // ========================================================================
    // Read-only Views
    // ========================================================================

    pub fn current_cycle(&self) -> Option<&GenerationCycle> {
        self.current.as_ref()
    }

    pub fn stats(&self) -> &RouteStats {
        &self.stats
    }

    /// Path of the latest committed cycle, empty when there is none.
    pub fn path(&self) -> &[GpsPoint] {
        self.current
            .as_ref()
            .map(|c| c.route.geometry.points())
            .unwrap_or(&[])
    }

    pub fn surfaces(&self) -> Option<&SurfaceBreakdown> {
        self.current.as_ref().map(|c| &c.surfaces)
    }

    pub fn elevation_profile(&self) -> &[ElevationPoint] {
        self.current
            .as_ref()
            .and_then(|c| c.elevation.as_ref())
            .map(|e| e.profile.as_slice())
            .unwrap_or(&[])
    }

    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            generation: self.current.as_ref().map(|c| c.sequence),
            waypoints: self.store.waypoints().to_vec(),
            selected_id: self.store.selected_id().map(str::to_string),
            path: PathGeometry::new(self.path().to_vec()),
            stats: self.stats.clone(),
            surfaces: self.surfaces().cloned().unwrap_or_default(),
            elevation_profile: self.elevation_profile().to_vec(),
        }
    }

    /// Snapshot as JSON for UI consumers.
    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
