//! Ordered waypoint collection.
//!
//! Every mutation returns a [`WaypointChange`] describing what happened and
//! who caused it. The change, not a flag living somewhere else, decides
//! whether the path has to be regenerated: snap-originated writes carry the
//! generation they were derived from and never ask for a new path.
//!
//! User edits with NaN, infinite or out-of-range coordinates are rejected
//! with [`crate::RouteError::InvalidCoordinate`] and leave the store untouched.

use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::{GpsPoint, Waypoint};

/// Who caused a waypoint mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChangeOrigin {
    /// A direct user edit
    User,
    /// A snap pass derived from the given generation
    Snap { generation: u64 },
}

/// What a mutation did to the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ids", rename_all = "camelCase")]
pub enum ChangeKind {
    Added(String),
    Removed(String),
    Moved(String),
    Renamed(String),
    Cleared,
    Snapped(Vec<String>),
}

/// What the route session must do after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    /// Enough waypoints remain: schedule a new path
    Regenerate,
    /// Too few waypoints: drop path, stats and analyses
    ClearDerived,
    /// Nothing depends on this change
    Nothing,
}

/// A single mutation event emitted by [`WaypointStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct WaypointChange {
    pub kind: ChangeKind,
    pub origin: ChangeOrigin,
    /// Waypoint count after the change
    pub count: usize,
}

impl WaypointChange {
    /// Decide the followup for this change given the minimum route size.
    pub fn followup(&self, min_waypoints: usize) -> Followup {
        if matches!(self.origin, ChangeOrigin::Snap { .. }) {
            return Followup::Nothing;
        }
        if matches!(self.kind, ChangeKind::Renamed(_)) {
            return Followup::Nothing;
        }
        if self.count >= min_waypoints {
            Followup::Regenerate
        } else {
            Followup::ClearDerived
        }
    }
}

/// Ordered, uniquely-identified waypoint collection.
///
/// Ids are `wp-<n>` from a counter that only moves forward, so an id is
/// never handed out twice for the lifetime of the store, even after `clear`.
#[derive(Debug, Clone, Default)]
pub struct WaypointStore {
    waypoints: Vec<Waypoint>,
    selected: Option<String>,
    next_id: u64,
}

impl WaypointStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoints in route order.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Coordinates in route order.
    pub fn coordinates(&self) -> Vec<GpsPoint> {
        self.waypoints.iter().map(|w| w.coordinates).collect()
    }

    pub fn get(&self, id: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.waypoints.iter().position(|w| w.id == id)
    }

    pub fn selected(&self) -> Option<&Waypoint> {
        self.selected.as_deref().and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a waypoint at the end of the route.
    ///
    /// The default name is derived from the new length ("Waypoint 3" for the
    /// third point).
    pub fn add(&mut self, coordinates: GpsPoint) -> Result<(Waypoint, WaypointChange)> {
        let index = self.waypoints.len();
        self.insert_at(index, coordinates)
    }

    /// Insert a waypoint before `index` (clamped to the end).
    pub fn insert(
        &mut self,
        index: usize,
        coordinates: GpsPoint,
    ) -> Result<(Waypoint, WaypointChange)> {
        let index = index.min(self.waypoints.len());
        self.insert_at(index, coordinates)
    }

    fn insert_at(
        &mut self,
        index: usize,
        coordinates: GpsPoint,
    ) -> Result<(Waypoint, WaypointChange)> {
        coordinates.validate()?;
        self.next_id += 1;
        let waypoint = Waypoint {
            id: format!("wp-{}", self.next_id),
            coordinates,
            name: Some(format!("Waypoint {}", self.waypoints.len() + 1)),
        };
        self.waypoints.insert(index, waypoint.clone());

        let change = self.change(ChangeKind::Added(waypoint.id.clone()), ChangeOrigin::User);
        Ok((waypoint, change))
    }

    pub fn remove(&mut self, id: &str) -> Result<WaypointChange> {
        let index = self.position(id).ok_or_waypoint_not_found(id)?;
        self.waypoints.remove(index);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        Ok(self.change(ChangeKind::Removed(id.to_string()), ChangeOrigin::User))
    }

    /// Move a waypoint without changing its place in the order.
    pub fn move_to(&mut self, id: &str, coordinates: GpsPoint) -> Result<WaypointChange> {
        coordinates.validate()?;
        let waypoint = self
            .waypoints
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_waypoint_not_found(id)?;
        waypoint.coordinates = coordinates;
        Ok(self.change(ChangeKind::Moved(id.to_string()), ChangeOrigin::User))
    }

    pub fn rename(&mut self, id: &str, name: Option<String>) -> Result<WaypointChange> {
        let waypoint = self
            .waypoints
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_waypoint_not_found(id)?;
        waypoint.name = name;
        Ok(self.change(ChangeKind::Renamed(id.to_string()), ChangeOrigin::User))
    }

    /// Select a waypoint, or clear the selection with `None`.
    ///
    /// Selection is not a mutation of the route and emits no change.
    pub fn select(&mut self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => {
                self.get(id).ok_or_waypoint_not_found(id)?;
                self.selected = Some(id.to_string());
            }
            None => self.selected = None,
        }
        Ok(())
    }

    pub fn clear(&mut self) -> WaypointChange {
        self.waypoints.clear();
        self.selected = None;
        self.change(ChangeKind::Cleared, ChangeOrigin::User)
    }

    /// Apply a batch of coordinate replacements from a snap pass.
    ///
    /// Unknown ids are skipped: a waypoint removed since the snap was
    /// computed simply has nothing to move.
    pub fn apply_snapped(
        &mut self,
        generation: u64,
        moves: &[(String, GpsPoint)],
    ) -> WaypointChange {
        let mut applied = Vec::with_capacity(moves.len());
        for (id, coordinates) in moves {
            if let Some(w) = self.waypoints.iter_mut().find(|w| &w.id == id) {
                w.coordinates = *coordinates;
                applied.push(id.clone());
            }
        }
        self.change(ChangeKind::Snapped(applied), ChangeOrigin::Snap { generation })
    }

    fn change(&self, kind: ChangeKind, origin: ChangeOrigin) -> WaypointChange {
        WaypointChange {
            kind,
            origin,
            count: self.waypoints.len(),
        }
    }
}
