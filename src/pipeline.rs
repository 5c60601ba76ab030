//! # Route Pipeline
//!
//! One engine shared by every screen that builds routes. It owns a
//! [`RouteSession`] and the injected providers, and runs a generation cycle
//! as:
//!
//! 1. issue a sequence-tagged request from the current waypoints
//! 2. await the directions provider
//! 3. classify surfaces and look up elevation on the same raw path
//! 4. commit the whole cycle (dropped if a newer request was issued)
//! 5. snap interior waypoints with a write that never re-triggers step 1
//!
//! The session lock is never held across an `await`, so overlapping cycles
//! interleave freely and only the sequence check decides what is applied.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::directions::{DirectionsProvider, RouteGenerator};
use crate::elevation::{ElevationAnalyzer, ElevationProvider};
use crate::error::Result;
use crate::session::{CommitOutcome, GenerationCycle, Notification, RouteSession, RouteSnapshot};
use crate::surface::SurfaceClassifier;
use crate::waypoints::{ChangeKind, Followup};
use crate::{GpsPoint, PipelineConfig, Waypoint};

/// How map clicks are interpreted. Passed with every event instead of being
/// read from shared mutable state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum EditMode {
    /// Clicks do not edit the route
    #[default]
    Viewing,
    /// Clicks append waypoints
    Building,
}

/// What a call to [`RoutePipeline::regenerate`] ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle was committed; `snapped` waypoints were moved onto the path
    Applied { sequence: u64, snapped: usize },
    /// A newer request superseded this one before it completed
    Stale { sequence: u64, latest: u64 },
    /// Too few waypoints: derived state was cleared, no request was made
    Cleared,
}

/// Route engine parameterized by its directions and elevation providers.
pub struct RoutePipeline {
    session: Mutex<RouteSession>,
    generator: RouteGenerator,
    analyzer: ElevationAnalyzer,
    classifier: SurfaceClassifier,
}

impl RoutePipeline {
    pub fn new(
        config: PipelineConfig,
        directions: Arc<dyn DirectionsProvider>,
        elevation: Arc<dyn ElevationProvider>,
    ) -> Result<Self> {
        config.validate()?;
        let sample_cap = config.elevation_sample_cap as usize;
        Ok(Self {
            session: Mutex::new(RouteSession::new(config)),
            generator: RouteGenerator::new(directions),
            analyzer: ElevationAnalyzer::with_sample_cap(elevation, sample_cap),
            classifier: SurfaceClassifier::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, RouteSession> {
        // Session state is replaced wholesale, a panic mid-update cannot
        // leave a partial cycle behind.
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a closure against the session.
    pub fn with_session<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut RouteSession) -> R,
    {
        let mut session = self.lock();
        f(&mut session)
    }

    pub fn snapshot(&self) -> RouteSnapshot {
        self.lock().snapshot()
    }

    pub fn snapshot_json(&self) -> String {
        self.lock().snapshot_json()
    }

    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.lock().drain_notifications()
    }

    // ========================================================================
    // User Edits
    // ========================================================================

    /// Interpret a map click under the given mode.
    pub async fn handle_map_click(
        &self,
        mode: EditMode,
        coordinates: GpsPoint,
    ) -> Result<Option<Waypoint>> {
        match mode {
            EditMode::Building => self.add_waypoint(coordinates).await.map(Some),
            EditMode::Viewing => Ok(None),
        }
    }

    pub async fn add_waypoint(&self, coordinates: GpsPoint) -> Result<Waypoint> {
        let (waypoint, followup) = self.with_session(|s| s.add_waypoint(coordinates))?;
        self.follow(followup).await;
        Ok(waypoint)
    }

    pub async fn insert_waypoint(&self, index: usize, coordinates: GpsPoint) -> Result<Waypoint> {
        let (waypoint, followup) =
            self.with_session(|s| s.insert_waypoint(index, coordinates))?;
        self.follow(followup).await;
        Ok(waypoint)
    }

    pub async fn remove_waypoint(&self, id: &str) -> Result<()> {
        let followup = self.with_session(|s| s.remove_waypoint(id))?;
        self.follow(followup).await;
        Ok(())
    }

    pub async fn move_waypoint(&self, id: &str, coordinates: GpsPoint) -> Result<()> {
        let followup = self.with_session(|s| s.move_waypoint(id, coordinates))?;
        self.follow(followup).await;
        Ok(())
    }

    pub fn rename_waypoint(&self, id: &str, name: Option<String>) -> Result<()> {
        self.with_session(|s| s.rename_waypoint(id, name)).map(|_| ())
    }

    pub fn select_waypoint(&self, id: Option<&str>) -> Result<()> {
        self.with_session(|s| s.select_waypoint(id))
    }

    pub fn clear(&self) {
        // dropping to zero waypoints always clears, nothing to await
        self.with_session(|s| s.clear_waypoints());
    }

    async fn follow(&self, followup: Followup) {
        if followup != Followup::Regenerate {
            return;
        }
        // failures are already queued as notifications
        if let Err(e) = self.regenerate().await {
            debug!("[RoutePipeline] Regeneration after edit failed: {}", e);
        }
    }

    // ========================================================================
    // Generation Cycle
    // ========================================================================

    /// Run one generation cycle for the current waypoints.
    ///
    /// Provider failures of the current request are queued as notifications
    /// and returned; the previous path and stats stay in place. Failures of a
    /// request that was superseded meanwhile report [`CycleOutcome::Stale`].
    pub async fn regenerate(&self) -> Result<CycleOutcome> {
        let Some(request) = self.with_session(|s| s.begin_generation()) else {
            return Ok(CycleOutcome::Cleared);
        };
        let sequence = request.sequence;

        let route = match self.generator.generate(&request.directions).await {
            Ok(route) => route,
            Err(e) => {
                return self.with_session(|s| {
                    if s.record_failure(sequence, &e) {
                        Err(e)
                    } else {
                        Ok(CycleOutcome::Stale {
                            sequence,
                            latest: s.latest_issued(),
                        })
                    }
                });
            }
        };

        let (surfaces, elevation) = futures::join!(
            async { self.classifier.classify(&route) },
            self.analyzer.analyze(route.geometry.points())
        );

        let elevation = match elevation {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!(
                    "[RoutePipeline] Generation {} continues without elevation: {}",
                    sequence, e
                );
                self.with_session(|s| {
                    s.record_warning(sequence, format!("Elevation unavailable: {}", e))
                });
                None
            }
        };

        let cycle = GenerationCycle::new(&request, route, surfaces, elevation);
        let outcome = self.with_session(|s| match s.commit(cycle) {
            CommitOutcome::Applied { sequence } => {
                let snapped = match s.snap(sequence).map(|c| c.kind) {
                    Some(ChangeKind::Snapped(ids)) => ids.len(),
                    _ => 0,
                };
                CycleOutcome::Applied { sequence, snapped }
            }
            CommitOutcome::Stale { sequence, latest } => CycleOutcome::Stale { sequence, latest },
        });
        Ok(outcome)
    }
}
