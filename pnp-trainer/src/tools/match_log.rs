use bevy::prelude::*;
use constants::selection::COORDINATE_EPSILON;

use super::features::FeatureHandle;

/// One committed correspondence between a 3D point and 2D features.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    /// Point in the cloud file's own coordinate frame (before scale and flip).
    pub point_3d: Vec3,
    pub features_2d: Vec<FeatureHandle>,
}

/// Ordered, undo-capable list of committed matches.
#[derive(Debug, Clone, Default)]
pub struct MatchLog {
    records: Vec<MatchRecord>,
}

impl MatchLog {
    pub fn push(&mut self, record: MatchRecord) {
        self.records.push(record);
    }

    /// Discard the most recent record. A popped record cannot be restored.
    pub fn pop(&mut self) -> Option<MatchRecord> {
        self.records.pop()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Latest record for `point`, compared per axis within the coordinate epsilon.
    pub fn find_by_point(&self, point: Vec3) -> Option<&MatchRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| (r.point_3d - point).abs().max_element() <= COORDINATE_EPSILON)
    }
}
