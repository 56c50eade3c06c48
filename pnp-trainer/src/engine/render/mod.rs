//! Point sprite rendering for the point cloud window and the matcher inset.
//!
//! Points are uploaded once as a sprite mesh. Selection changes rewrite only
//! the per-vertex selection channel, which the shader turns into the anchor
//! and neighbour highlight.

use bevy::asset::embedded_asset;
use bevy::prelude::*;

/// Frame systems moving selection and viewport changes into render assets.
///
/// Missing meshes or materials are logged and skipped for the frame.
pub mod bridge;

/// Point sprite material and the custom selection vertex attribute.
pub mod material;

/// Sprite mesh construction and in-place selection channel updates.
pub mod point_cloud_mesh;

/// CPU-side point vertex layout and selection weights.
pub mod vertex_buffer;

use material::PointCloudMaterial;

/// Registers the embedded point shader and the sprite material.
pub struct PointCloudRenderPlugin;

impl Plugin for PointCloudRenderPlugin {
    fn build(&self, app: &mut App) {
        embedded_asset!(app, "point_cloud.wgsl");

        app.add_plugins(MaterialPlugin::<PointCloudMaterial> {
            prepass_enabled: false,
            shadows_enabled: false,
            ..default()
        });
    }
}
