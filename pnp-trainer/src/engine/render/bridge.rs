use bevy::prelude::*;
use thiserror::Error;

use super::material::PointCloudMaterial;
use super::point_cloud_mesh::{create_point_sprite_mesh, update_selection_attribute};
use super::vertex_buffer::{PointVertex, apply_selection};
use crate::engine::core::session::SharedSession;

/// A render asset the frame systems expected was not there. The frame is
/// drawn without the update and the app keeps running.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderResourceError {
    #[error("point mesh {0:?} is not loaded")]
    MissingMesh(AssetId<Mesh>),

    #[error("point material {0:?} is not loaded")]
    MissingMaterial(AssetId<PointCloudMaterial>),

    #[error("point mesh holds {found} vertices, expected {expected}")]
    LayoutMismatch { expected: usize, found: usize },
}

/// Full cloud as shown in the point cloud window.
#[derive(Resource)]
pub struct ViewerPoints {
    pub vertices: Vec<PointVertex>,
    pub mesh: Handle<Mesh>,
    pub uploaded_revision: u64,
}

/// Normalised neighbourhood shown in the matcher inset.
#[derive(Resource)]
pub struct InsetPoints {
    pub mesh: Handle<Mesh>,
    pub uploaded_revision: u64,
}

/// Marks the entity drawing [`InsetPoints`].
#[derive(Component)]
pub struct InsetPointCloud;

/// Material whose viewport size follows this camera.
#[derive(Component, Clone)]
pub struct PointSpriteTarget(pub Handle<PointCloudMaterial>);

/// Rewrite the selection channel of `handle` from `vertices`.
pub fn upload_selection(
    meshes: &mut Assets<Mesh>,
    handle: &Handle<Mesh>,
    vertices: &[PointVertex],
) -> Result<(), RenderResourceError> {
    let mesh = meshes
        .get_mut(handle)
        .ok_or(RenderResourceError::MissingMesh(handle.id()))?;
    if update_selection_attribute(mesh, vertices) {
        Ok(())
    } else {
        Err(RenderResourceError::LayoutMismatch {
            expected: vertices.len() * super::point_cloud_mesh::VERTICES_PER_POINT,
            found: mesh.count_vertices(),
        })
    }
}

/// Swap the contents of `handle` for a freshly built sprite mesh.
pub fn replace_points(
    meshes: &mut Assets<Mesh>,
    handle: &Handle<Mesh>,
    vertices: &[PointVertex],
) -> Result<(), RenderResourceError> {
    let mesh = meshes
        .get_mut(handle)
        .ok_or(RenderResourceError::MissingMesh(handle.id()))?;
    *mesh = create_point_sprite_mesh(vertices);
    Ok(())
}

pub fn upload_viewer_selection(
    session: Res<SharedSession>,
    mut points: ResMut<ViewerPoints>,
    mut meshes: ResMut<Assets<Mesh>>,
) {
    let state = session.lock();
    let revision = state.controller.revision();
    if revision == points.uploaded_revision {
        return;
    }

    let points = &mut *points;
    let changed = apply_selection(&mut points.vertices, state.controller.selection());
    match upload_selection(&mut meshes, &points.mesh, &points.vertices) {
        Ok(()) => {
            debug!("Uploaded selection revision {revision} ({changed} points changed)");
            points.uploaded_revision = revision;
        }
        Err(err) => warn_once!("Skipping selection upload: {err}"),
    }
}

pub fn upload_inset_points(
    session: Res<SharedSession>,
    mut inset: ResMut<InsetPoints>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut visibility: Query<&mut Visibility, With<InsetPointCloud>>,
) {
    let state = session.lock();
    let revision = state.panel.revision();
    if revision == inset.uploaded_revision {
        return;
    }

    let vertices = state.panel.vertices();
    let shown = !vertices.is_empty();
    if shown {
        if let Err(err) = replace_points(&mut meshes, &inset.mesh, &vertices) {
            warn_once!("Skipping inset upload: {err}");
            return;
        }
    }
    for mut v in &mut visibility {
        *v = if shown { Visibility::Inherited } else { Visibility::Hidden };
    }
    inset.uploaded_revision = revision;
}

/// Keep each sprite material's viewport size in step with its camera so
/// points stay a fixed number of pixels wide.
pub fn sync_point_sprite_viewports(
    cameras: Query<(&Camera, &PointSpriteTarget)>,
    mut materials: ResMut<Assets<PointCloudMaterial>>,
) {
    for (camera, target) in &cameras {
        let Some(size) = camera.physical_viewport_size() else {
            continue;
        };
        let size = size.as_vec2();
        match materials.get(&target.0) {
            Some(material) if material.viewport() == size.max(Vec2::ONE) => {}
            Some(_) => {
                if let Some(material) = materials.get_mut(&target.0) {
                    material.set_viewport(size);
                }
            }
            None => warn_once!("{}", RenderResourceError::MissingMaterial(target.0.id())),
        }
    }
}
