use bevy::prelude::*;
use bevy::render::mesh::{PrimitiveTopology, VertexAttributeValues};
use bevy::render::render_asset::RenderAssetUsages;

use super::material::ATTRIBUTE_SELECTION;
use super::vertex_buffer::PointVertex;

/// Quad corners of one point sprite as two triangles.
const CORNERS: [[f32; 2]; 6] = [
    [-1.0, -1.0],
    [1.0, -1.0],
    [1.0, 1.0],
    [-1.0, -1.0],
    [1.0, 1.0],
    [-1.0, 1.0],
];

/// Vertices emitted per point.
pub const VERTICES_PER_POINT: usize = CORNERS.len();

/// Expand the point buffer into a sprite mesh, six vertices per point.
/// Kept in the main world as well so the selection channel can be rewritten.
pub fn create_point_sprite_mesh(points: &[PointVertex]) -> Mesh {
    let count = points.len() * VERTICES_PER_POINT;
    let mut positions = Vec::with_capacity(count);
    let mut corners = Vec::with_capacity(count);
    let mut colours = Vec::with_capacity(count);
    let mut weights = Vec::with_capacity(count);

    for point in points {
        for corner in CORNERS {
            positions.push(point.position);
            corners.push(corner);
            colours.push(point.colour);
            weights.push(point.selection);
        }
    }

    Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
        .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
        .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, corners)
        .with_inserted_attribute(Mesh::ATTRIBUTE_COLOR, colours)
        .with_inserted_attribute(ATTRIBUTE_SELECTION, weights)
}

/// Replace the selection channel of a mesh built by [`create_point_sprite_mesh`].
/// Returns `false` when the mesh does not hold one sprite per point.
pub fn update_selection_attribute(mesh: &mut Mesh, points: &[PointVertex]) -> bool {
    let expected = points.len() * VERTICES_PER_POINT;
    match mesh.attribute(ATTRIBUTE_SELECTION) {
        Some(VertexAttributeValues::Float32(values)) if values.len() == expected => {}
        _ => return false,
    }
    let weights: Vec<f32> = points
        .iter()
        .flat_map(|p| std::iter::repeat_n(p.selection, VERTICES_PER_POINT))
        .collect();
    mesh.insert_attribute(ATTRIBUTE_SELECTION, weights);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(selection: f32) -> PointVertex {
        PointVertex {
            position: [1.0, 2.0, 3.0],
            selection,
            colour: [1.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn six_vertices_per_point() {
        let mesh = create_point_sprite_mesh(&[vertex(-1.0), vertex(0.0)]);
        assert_eq!(mesh.count_vertices(), 12);
    }

    #[test]
    fn selection_channel_is_rewritten_in_place() {
        let mut points = vec![vertex(-1.0), vertex(-1.0)];
        let mut mesh = create_point_sprite_mesh(&points);
        points[1].selection = 0.0;
        assert!(update_selection_attribute(&mut mesh, &points));
        let Some(VertexAttributeValues::Float32(values)) = mesh.attribute(ATTRIBUTE_SELECTION) else {
            panic!("selection attribute missing");
        };
        assert_eq!(&values[..6], &[-1.0; 6]);
        assert_eq!(&values[6..], &[0.0; 6]);

        assert!(!update_selection_attribute(&mut mesh, &points[..1]));
    }
}
