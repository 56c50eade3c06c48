use bevy::pbr::{MaterialPipeline, MaterialPipelineKey};
use bevy::prelude::*;
use bevy::reflect::TypePath;
use bevy::render::mesh::{MeshVertexAttribute, MeshVertexBufferLayoutRef};
use bevy::render::render_resource::{
    AsBindGroup, RenderPipelineDescriptor, ShaderRef, SpecializedMeshPipelineError, VertexFormat,
};
use constants::render_settings::{ANCHOR_COLOUR, NEIGHBOUR_COLOUR};

pub const POINT_CLOUD_SHADER: &str = "embedded://pnp_trainer/engine/render/point_cloud.wgsl";

/// Per-vertex selection weight (0 anchor, 1 neighbour, -1 unselected).
pub const ATTRIBUTE_SELECTION: MeshVertexAttribute =
    MeshVertexAttribute::new("PointSelection", 917_340_221, VertexFormat::Float32);

/// Screen-aligned point sprites. Each point is a quad of six vertices
/// sharing the point centre; the corner offset in UV_0 is scaled to
/// `point_size` pixels in the vertex shader.
#[derive(Asset, TypePath, AsBindGroup, Debug, Clone)]
pub struct PointCloudMaterial {
    /// x: point size in pixels, yz: viewport size in physical pixels.
    #[uniform(0)]
    pub params: Vec4,
    #[uniform(1)]
    pub anchor_colour: LinearRgba,
    #[uniform(2)]
    pub neighbour_colour: LinearRgba,
}

impl PointCloudMaterial {
    pub fn new(point_size: f32) -> Self {
        Self {
            params: Vec4::new(point_size, 1.0, 1.0, 0.0),
            anchor_colour: ANCHOR_COLOUR.to_linear(),
            neighbour_colour: NEIGHBOUR_COLOUR.to_linear(),
        }
    }

    pub fn point_size(&self) -> f32 {
        self.params.x
    }

    pub fn viewport(&self) -> Vec2 {
        Vec2::new(self.params.y, self.params.z)
    }

    pub fn set_viewport(&mut self, size: Vec2) {
        self.params.y = size.x.max(1.0);
        self.params.z = size.y.max(1.0);
    }
}

impl Material for PointCloudMaterial {
    fn vertex_shader() -> ShaderRef {
        POINT_CLOUD_SHADER.into()
    }

    fn fragment_shader() -> ShaderRef {
        POINT_CLOUD_SHADER.into()
    }

    fn specialize(
        _pipeline: &MaterialPipeline<Self>,
        descriptor: &mut RenderPipelineDescriptor,
        layout: &MeshVertexBufferLayoutRef,
        _key: MaterialPipelineKey<Self>,
    ) -> Result<(), SpecializedMeshPipelineError> {
        let vertex_layout = layout.0.get_layout(&[
            Mesh::ATTRIBUTE_POSITION.at_shader_location(0),
            Mesh::ATTRIBUTE_UV_0.at_shader_location(1),
            Mesh::ATTRIBUTE_COLOR.at_shader_location(2),
            ATTRIBUTE_SELECTION.at_shader_location(3),
        ])?;
        descriptor.vertex.buffers = vec![vertex_layout];
        descriptor.primitive.cull_mode = None;
        Ok(())
    }
}
