//! Selected-point state of the point cloud window and its synchronisation
//! with the match window.
//!
//! A pick sets an anchor and pulls in every point within the neighbourhood
//! radius. The match window may later move the anchor to another member of
//! that neighbourhood, and commits the anchor together with its selected 2D
//! features into the [`MatchLog`].

use std::collections::HashMap;

use bevy::prelude::*;
use constants::selection::{COORDINATE_EPSILON, NEIGHBOURHOOD_RADIUS};
use thiserror::Error;

use super::features::FeatureHandle;
use super::match_log::{MatchLog, MatchRecord};
use super::picking::PointHit;
use crate::engine::assets::point_cloud::PointCloud;
use crate::engine::spatial_index::SpatialIndex;

/// One selected point as handed to the match window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighbourPoint {
    /// File-space coordinate.
    pub original: Vec3,
    /// Distance from the anchor, 0 for the anchor itself.
    pub distance: f32,
    pub anchor: bool,
}

/// Receiver of selection changes made in the point cloud window.
pub trait CompanionView {
    /// A new anchor was picked. `recorded` is the earlier match for the same
    /// point, if one was committed.
    fn on_3d_point_selected(&mut self, original: Vec3, recorded: Option<&MatchRecord>);

    /// The selected members changed (new pick or moved anchor).
    fn on_neighbourhood_changed(&mut self, points: &[NeighbourPoint]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    AnchorSelected,
    NeighbourhoodPopulated,
    CommittedMatch,
}

/// Anchor plus neighbourhood, keyed by point index.
///
/// `neighbourhood` stores each member's distance from the point that was
/// originally picked. The anchor reports 0 whatever its stored distance is,
/// so moving the anchor never loses a member's distance. Only the picked
/// point itself stores 0; once it stops being the anchor it takes its
/// distance to the new anchor instead.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    anchor: Option<usize>,
    neighbourhood: HashMap<usize, f32>,
}

impl SelectionSet {
    pub fn anchor(&self) -> Option<usize> {
        self.anchor
    }

    pub fn len(&self) -> usize {
        self.neighbourhood.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbourhood.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.neighbourhood.contains_key(&index)
    }

    pub fn distance(&self, index: usize) -> Option<f32> {
        if self.anchor == Some(index) {
            return Some(0.0);
        }
        self.neighbourhood.get(&index).copied()
    }

    /// `(index, distance)` for every member, anchor included.
    pub fn members(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.neighbourhood
            .iter()
            .map(|(&i, &d)| (i, if self.anchor == Some(i) { 0.0 } else { d }))
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.neighbourhood.clear();
    }

    fn set_anchor(&mut self, index: usize) {
        self.clear();
        self.anchor = Some(index);
        self.neighbourhood.insert(index, 0.0);
    }

    fn insert_member(&mut self, index: usize, distance: f32) {
        if self.anchor != Some(index) {
            self.neighbourhood.insert(index, distance.max(f32::MIN_POSITIVE));
        }
    }

    /// `gap` is the distance between the old and the new anchor.
    fn move_anchor(&mut self, index: usize, gap: f32) {
        if let Some(old) = self.anchor.replace(index) {
            if let Some(d) = self.neighbourhood.get_mut(&old) {
                if *d == 0.0 {
                    *d = gap.max(f32::MIN_POSITIVE);
                }
            }
        }
    }
}

/// Why a commit was refused. Shown to the user, never fatal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CommitRejected {
    #[error("no 3D point selected")]
    NoAnchor,

    #[error("no 2D features selected")]
    NoFeatures,
}

#[derive(Debug, Clone)]
pub struct SelectionSyncController {
    selection: SelectionSet,
    state: SelectionState,
    revision: u64,
    neighbourhood_radius: f32,
    log: MatchLog,
}

impl Default for SelectionSyncController {
    fn default() -> Self {
        Self::new(NEIGHBOURHOOD_RADIUS)
    }
}

impl SelectionSyncController {
    pub fn new(neighbourhood_radius: f32) -> Self {
        Self {
            selection: SelectionSet::default(),
            state: SelectionState::Idle,
            revision: 0,
            neighbourhood_radius,
            log: MatchLog::default(),
        }
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Bumped on every change to the selection. Frame systems compare it
    /// with the last value they uploaded.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn log(&self) -> &MatchLog {
        &self.log
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Replace the selection with `hit` and its neighbourhood, then tell the
    /// companion about the new anchor in file coordinates.
    pub fn select_point(
        &mut self,
        hit: &PointHit,
        cloud: &PointCloud,
        index: &SpatialIndex,
        companion: &mut dyn CompanionView,
    ) {
        let Some(original) = cloud.original(hit.index) else {
            return;
        };
        self.selection.set_anchor(hit.index);
        self.state = SelectionState::AnchorSelected;

        for (i, distance) in index.radius_query(hit.position, self.neighbourhood_radius) {
            self.selection.insert_member(i, distance);
        }
        if self.selection.len() > 1 {
            self.state = SelectionState::NeighbourhoodPopulated;
        }
        self.touch();

        debug!(
            "Selected point {} with {} neighbours",
            hit.index,
            self.selection.len() - 1
        );
        companion.on_3d_point_selected(original, self.log.find_by_point(original));
    }

    /// The match window reports that file-space point `original` is now its
    /// anchor. Moves the anchor to the matching member, if any. Returns
    /// whether the anchor moved; an unknown point is ignored.
    pub fn notify_external_anchor_change(&mut self, original: Vec3, cloud: &PointCloud) -> bool {
        let target = cloud.transform().apply(original);
        let found = self.selection.neighbourhood.keys().copied().find(|&i| {
            cloud
                .position(i)
                .is_some_and(|p| (p - target).abs().max_element() <= COORDINATE_EPSILON)
        });
        match found {
            Some(i) if self.selection.anchor != Some(i) => {
                let gap = match (self.selection.anchor.and_then(|a| cloud.position(a)), cloud.position(i)) {
                    (Some(old), Some(new)) => old.distance(new),
                    _ => 0.0,
                };
                self.selection.move_anchor(i, gap);
                self.touch();
                true
            }
            _ => false,
        }
    }

    /// Selected members in file coordinates, nearest first.
    pub fn neighbourhood_points(&self, cloud: &PointCloud) -> Vec<NeighbourPoint> {
        let mut points: Vec<NeighbourPoint> = self
            .selection
            .members()
            .filter_map(|(i, distance)| {
                cloud.original(i).map(|original| NeighbourPoint {
                    original,
                    distance,
                    anchor: self.selection.anchor == Some(i),
                })
            })
            .collect();
        points.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(b.anchor.cmp(&a.anchor)));
        points
    }

    /// Record the anchor with `features` and clear the selection.
    pub fn commit_match(
        &mut self,
        features: &[FeatureHandle],
        cloud: &PointCloud,
    ) -> Result<&MatchRecord, CommitRejected> {
        let original = self
            .selection
            .anchor
            .and_then(|i| cloud.original(i))
            .ok_or(CommitRejected::NoAnchor)?;
        if features.is_empty() {
            return Err(CommitRejected::NoFeatures);
        }
        self.log.push(MatchRecord {
            point_3d: original,
            features_2d: features.to_vec(),
        });
        self.selection.clear();
        self.state = SelectionState::CommittedMatch;
        self.touch();
        info!("Committed match {} at {:?}", self.log.len(), original);
        self.log.records().last().ok_or(CommitRejected::NoAnchor)
    }

    /// Drop the most recent match. Returns `None` when the log is empty.
    pub fn undo_last(&mut self) -> Option<MatchRecord> {
        let record = self.log.pop()?;
        if self.state == SelectionState::CommittedMatch {
            self.state = SelectionState::Idle;
        }
        Some(record)
    }
}
