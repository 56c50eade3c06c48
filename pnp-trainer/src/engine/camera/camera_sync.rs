use bevy::prelude::*;
use bevy::render::camera::Viewport;

use crate::engine::core::views::{ViewKind, ViewRegistry};
use crate::tools::matcher::MatcherView;
use crate::tools::viewer::ViewerView;

/// Camera of the point cloud window.
#[derive(Component)]
pub struct ViewerCamera;

/// 3D camera drawing the neighbourhood inset of the match window.
#[derive(Component)]
pub struct InsetCamera;

/// 2D camera drawing the image panel of the match window.
#[derive(Component)]
pub struct ImagePanelCamera;

/// Physical-pixel viewport for a logical rectangle, clipped to the window.
/// `None` when nothing of the rectangle is visible.
pub fn physical_viewport(rect: Rect, scale_factor: f32, window: UVec2) -> Option<Viewport> {
    let position = (rect.min * scale_factor).round().max(Vec2::ZERO).as_uvec2();
    if position.x >= window.x || position.y >= window.y {
        return None;
    }
    let size = (rect.size() * scale_factor).round().as_uvec2().min(window - position);
    if size.x == 0 || size.y == 0 {
        return None;
    }
    Some(Viewport {
        physical_position: position,
        physical_size: size,
        ..default()
    })
}

pub fn sync_viewer_camera(viewer: Res<ViewerView>, mut cameras: Query<&mut Transform, With<ViewerCamera>>) {
    for mut transform in &mut cameras {
        *transform = viewer.camera().transform();
    }
}

/// Lay out the two match window cameras side by side and place them.
pub fn sync_match_cameras(
    matcher: Res<MatcherView>,
    registry: Res<ViewRegistry>,
    windows: Query<&Window>,
    mut image: Query<(&mut Camera, &mut Transform), (With<ImagePanelCamera>, Without<InsetCamera>)>,
    mut inset: Query<(&mut Camera, &mut Transform), (With<InsetCamera>, Without<ImagePanelCamera>)>,
) {
    let Some(window) = registry
        .window(ViewKind::Matcher)
        .and_then(|entity| windows.get(entity).ok())
    else {
        return;
    };
    let scale = window.resolution.scale_factor();
    let physical = UVec2::new(window.physical_width(), window.physical_height());

    let height = matcher.window_size().y;
    let panel_width = matcher.image_panel_width();
    let panel = Rect::new(0.0, 0.0, panel_width, height);

    for (mut camera, mut transform) in &mut image {
        camera.viewport = physical_viewport(panel, scale, physical);
        camera.is_active = camera.viewport.is_some();
        *transform = Transform::from_xyz(panel_width * 0.5, -height * 0.5, 0.0);
    }
    for (mut camera, mut transform) in &mut inset {
        camera.viewport = physical_viewport(matcher.inset_rect(), scale, physical);
        camera.is_active = camera.viewport.is_some();
        *transform = matcher.camera().transform();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_scales_and_clips() {
        let window = UVec2::new(2048, 1536);
        let viewport = physical_viewport(Rect::new(400.0, 0.0, 1100.0, 768.0), 2.0, window).unwrap();
        assert_eq!(viewport.physical_position, UVec2::new(800, 0));
        assert_eq!(viewport.physical_size, UVec2::new(1248, 1536));
    }

    #[test]
    fn empty_or_offscreen_rect_has_no_viewport() {
        let window = UVec2::new(1024, 768);
        assert!(physical_viewport(Rect::new(0.0, 0.0, 0.0, 768.0), 1.0, window).is_none());
        assert!(physical_viewport(Rect::new(1024.0, 0.0, 1200.0, 768.0), 1.0, window).is_none());
    }
}
