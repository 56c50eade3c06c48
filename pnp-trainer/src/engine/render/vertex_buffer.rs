use bytemuck::{Pod, Zeroable};
use constants::render_settings::{
    ANCHOR_WEIGHT, DEFAULT_POINT_COLOUR, NEIGHBOUR_WEIGHT, UNSELECTED_WEIGHT,
};

use crate::engine::assets::point_cloud::PointCloud;
use crate::tools::selection::SelectionSet;

/// One point as uploaded to the renderer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    /// 0 anchor, 1 neighbour, -1 unselected.
    pub selection: f32,
    pub colour: [f32; 4],
}

/// Selection channel value for point `i`.
pub fn selection_weight(selection: &SelectionSet, i: usize) -> f32 {
    if selection.anchor() == Some(i) {
        ANCHOR_WEIGHT
    } else if selection.contains(i) {
        NEIGHBOUR_WEIGHT
    } else {
        UNSELECTED_WEIGHT
    }
}

/// Full vertex buffer for the cloud in its current selection state.
pub fn build_vertices(cloud: &PointCloud, selection: &SelectionSet) -> Vec<PointVertex> {
    cloud
        .positions()
        .iter()
        .enumerate()
        .map(|(i, p)| PointVertex {
            position: p.to_array(),
            selection: selection_weight(selection, i),
            colour: cloud.colour(i).unwrap_or(DEFAULT_POINT_COLOUR),
        })
        .collect()
}

/// Rewrite only the selection channel. Returns the number of vertices that changed.
pub fn apply_selection(buffer: &mut [PointVertex], selection: &SelectionSet) -> usize {
    let mut changed = 0;
    for (i, vertex) in buffer.iter_mut().enumerate() {
        let weight = selection_weight(selection, i);
        if vertex.selection != weight {
            vertex.selection = weight;
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::point_cloud::PointTransform;
    use crate::engine::spatial_index::SpatialIndex;
    use crate::tools::picking::PointHit;
    use crate::tools::selection::{CompanionView, NeighbourPoint, SelectionSyncController};
    use crate::tools::match_log::MatchRecord;
    use bevy::prelude::Vec3;

    struct Silent;

    impl CompanionView for Silent {
        fn on_3d_point_selected(&mut self, _original: Vec3, _recorded: Option<&MatchRecord>) {}
        fn on_neighbourhood_changed(&mut self, _points: &[NeighbourPoint]) {}
    }

    #[test]
    fn vertex_layout_is_eight_floats() {
        assert_eq!(std::mem::size_of::<PointVertex>(), 8 * 4);
        let v = PointVertex {
            position: [1.0, 2.0, 3.0],
            selection: -1.0,
            colour: [0.0, 0.5, 1.0, 1.0],
        };
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(floats, &[1.0, 2.0, 3.0, -1.0, 0.0, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn weights_follow_selection() {
        let points = [Vec3::ZERO, Vec3::X, Vec3::new(10.0, 0.0, 0.0)];
        let cloud = PointCloud::from_points(PointTransform::default(), &points);
        let index = SpatialIndex::build(cloud.positions()).expect("index");
        let mut controller = SelectionSyncController::default();

        let mut buffer = build_vertices(&cloud, controller.selection());
        assert!(buffer.iter().all(|v| v.selection == UNSELECTED_WEIGHT));
        assert_eq!(buffer[0].colour, DEFAULT_POINT_COLOUR);

        let hit = PointHit {
            index: 0,
            eye_distance: 1.0,
            position: Vec3::ZERO,
        };
        controller.select_point(&hit, &cloud, &index, &mut Silent);
        assert_eq!(apply_selection(&mut buffer, controller.selection()), 2);
        let weights: Vec<f32> = buffer.iter().map(|v| v.selection).collect();
        assert_eq!(weights, vec![ANCHOR_WEIGHT, NEIGHBOUR_WEIGHT, UNSELECTED_WEIGHT]);
        assert_eq!(apply_selection(&mut buffer, controller.selection()), 0);
    }
}
