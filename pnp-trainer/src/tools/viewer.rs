use bevy::prelude::*;
use constants::render_settings::{AXIS_COLOURS, PICK_RAY_COLOUR};
use constants::status::{ERROR_COLOUR, ERROR_TIMEOUT, PICKING_UNAVAILABLE};

use super::picking::PickingEngine;
use crate::engine::assets::bounds::BoundingStats;
use crate::engine::camera::orbit_camera::{OrbitCamera, OrbitLimits};
use crate::engine::core::session::SessionState;
use crate::engine::core::views::{Modifiers, ViewInput};

/// Input state of the point cloud window.
///
/// Left-drag orbits, the wheel zooms and releasing the right button picks
/// the point under the cursor.
#[derive(Resource, Debug, Clone)]
pub struct ViewerView {
    camera: OrbitCamera,
    picking: PickingEngine,
    viewport: Vec2,
    cursor: Vec2,
    drag_from: Option<Vec2>,
    last_pick: Option<(Vec3, Vec3)>,
    axes: CoordinateAxes,
}

/// World axes through the cloud centre, each as long as the bounding
/// diagonal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateAxes {
    pub origin: Vec3,
    pub length: f32,
}

impl CoordinateAxes {
    pub fn for_bounds(stats: &BoundingStats) -> Self {
        Self {
            origin: stats.centre,
            length: stats.max_r(),
        }
    }

    /// Start, end and colour of the X, Y and Z lines.
    pub fn segments(&self) -> [(Vec3, Vec3, Color); 3] {
        let [x, y, z] = AXIS_COLOURS;
        let o = self.origin;
        [
            (o, o + Vec3::X * self.length, x),
            (o, o + Vec3::Y * self.length, y),
            (o, o + Vec3::Z * self.length, z),
        ]
    }
}

impl ViewerView {
    pub fn new(stats: &BoundingStats, viewport: Vec2) -> Self {
        Self {
            camera: OrbitCamera::for_bounds(stats, OrbitLimits::VIEWER),
            picking: PickingEngine::VIEWER,
            viewport,
            cursor: Vec2::ZERO,
            drag_from: None,
            last_pick: None,
            axes: CoordinateAxes::for_bounds(stats),
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn aspect(&self) -> f32 {
        if self.viewport.y > 0.0 {
            self.viewport.x / self.viewport.y
        } else {
            1.0
        }
    }

    pub fn axes(&self) -> CoordinateAxes {
        self.axes
    }

    /// Eye-to-hit segment of the last successful pick.
    pub fn last_pick(&self) -> Option<(Vec3, Vec3)> {
        self.last_pick
    }

    /// Pick at the current cursor and, on a hit, replace the selection.
    /// Returns whether a point was hit.
    pub fn pick(&mut self, session: &mut SessionState) -> bool {
        let SessionState {
            cloud,
            index,
            controller,
            panel,
            status,
            now,
            ..
        } = session;
        let Ok(index) = index.as_ref() else {
            status.post(PICKING_UNAVAILABLE, ERROR_COLOUR, ERROR_TIMEOUT, *now);
            return false;
        };

        let inv_projection = self.camera.inverse_projection(self.aspect());
        let inv_view = self.camera.inverse_view();
        let picked = self.picking.pick(
            self.cursor,
            self.viewport,
            &inv_projection,
            &inv_view,
            cloud.positions(),
            controller.selection().anchor(),
        );
        let Some((hit, ray)) = picked else {
            return false;
        };

        self.last_pick = Some(hit.segment(&ray));
        controller.select_point(&hit, cloud, index, panel);
        true
    }
}

impl ViewInput for ViewerView {
    fn on_cursor(&mut self, _session: &mut SessionState, position: Vec2) {
        self.cursor = position;
        if let Some(from) = self.drag_from {
            let delta = position - from;
            self.camera.rotate(delta.x, delta.y);
            self.drag_from = Some(position);
        }
    }

    fn on_button(
        &mut self,
        session: &mut SessionState,
        button: MouseButton,
        pressed: bool,
        _modifiers: Modifiers,
    ) {
        match (button, pressed) {
            (MouseButton::Right, false) => {
                self.pick(session);
            }
            (MouseButton::Left, true) => self.drag_from = Some(self.cursor),
            (MouseButton::Left, false) => self.drag_from = None,
            _ => {}
        }
    }

    fn on_scroll(&mut self, _session: &mut SessionState, delta: Vec2) {
        self.camera.zoom(delta.y);
    }

    fn on_resize(&mut self, size: Vec2) {
        self.viewport = size;
    }
}

/// Line from the eye to the last picked point.
pub fn draw_pick_ray(viewer: Res<ViewerView>, mut gizmos: Gizmos) {
    if let Some((from, to)) = viewer.last_pick() {
        gizmos.line(from, to, PICK_RAY_COLOUR);
    }
}

pub fn draw_axes(viewer: Res<ViewerView>, mut gizmos: Gizmos) {
    for (from, to, colour) in viewer.axes().segments() {
        gizmos.line(from, to, colour);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::bounds::CentreMode;
    use crate::engine::assets::point_cloud::{PointCloud, PointTransform};
    use crate::engine::loading::point_cloud_loader::LoadedCloud;
    use crate::engine::spatial_index::IndexError;
    use crate::tools::features::FeatureArena;
    use crate::tools::matcher::MatchPanel;
    use std::f32::consts::FRAC_PI_2;
    use std::path::PathBuf;

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    fn corner_session() -> SessionState {
        let points = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        let cloud = PointCloud::from_points(PointTransform::default(), &points);
        let loaded = LoadedCloud::from_cloud(cloud, CentreMode::Mean).expect("non-empty cloud");
        let panel = MatchPanel::new(FeatureArena::default(), None, PointTransform::default());
        SessionState::new(loaded, panel, PathBuf::from("unused.json"))
    }

    /// Viewer on the +x axis looking at the origin. The radius is clamped to
    /// the orbit range of the small test cloud.
    fn view_along_x(session: &SessionState) -> ViewerView {
        let mut view = ViewerView::new(&session.stats, VIEWPORT);
        view.camera_mut().set_centre(Vec3::ZERO);
        view.camera_mut().set_spherical(10.0, FRAC_PI_2, FRAC_PI_2);
        view
    }

    fn screen_position(view: &ViewerView, p: Vec3) -> Vec2 {
        let clip = view.camera().projection_matrix(view.aspect()) * view.camera().view_matrix() * p.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        Vec2::new((ndc.x + 1.0) * 0.5 * VIEWPORT.x, (1.0 - ndc.y) * 0.5 * VIEWPORT.y)
    }

    #[test]
    fn right_release_picks_and_selects() {
        let mut session = corner_session();
        let mut view = view_along_x(&session);
        let target = screen_position(&view, Vec3::X);

        view.on_cursor(&mut session, target);
        view.on_button(&mut session, MouseButton::Right, true, Modifiers::default());
        assert_eq!(session.controller.selection().anchor(), None);
        view.on_button(&mut session, MouseButton::Right, false, Modifiers::default());

        assert_eq!(session.controller.selection().anchor(), Some(1));
        let (eye, hit) = view.last_pick().expect("pick segment");
        assert!(hit.distance(Vec3::X) < 1e-5);
        assert!((eye - view.camera().eye()).length() < 1e-4);
    }

    #[test]
    fn left_drag_orbits() {
        let mut session = corner_session();
        let mut view = view_along_x(&session);
        let theta = view.camera().theta();

        view.on_cursor(&mut session, Vec2::new(100.0, 100.0));
        view.on_button(&mut session, MouseButton::Left, true, Modifiers::default());
        view.on_cursor(&mut session, Vec2::new(140.0, 102.0));
        assert!(view.camera().theta() != theta);

        view.on_button(&mut session, MouseButton::Left, false, Modifiers::default());
        let settled = view.camera().theta();
        view.on_cursor(&mut session, Vec2::new(300.0, 102.0));
        assert_eq!(view.camera().theta(), settled);
    }

    #[test]
    fn pick_without_index_reports_unavailable() {
        let mut session = corner_session();
        session.index = Err(IndexError::Empty);
        let mut view = view_along_x(&session);

        assert!(!view.pick(&mut session));
        assert_eq!(
            session.status.current().map(|m| m.text.as_str()),
            Some(PICKING_UNAVAILABLE)
        );
    }

    #[test]
    fn axes_start_at_the_centre_and_span_the_diagonal() {
        let session = corner_session();
        let view = ViewerView::new(&session.stats, VIEWPORT);
        let axes = view.axes();
        assert_eq!(axes.origin, session.stats.centre);
        assert!((axes.length - 3f32.sqrt()).abs() < 1e-6);

        let segments = axes.segments();
        for ((from, to, colour), (axis, expected)) in segments
            .iter()
            .zip([Vec3::X, Vec3::Y, Vec3::Z].into_iter().zip(AXIS_COLOURS))
        {
            assert_eq!(*from, session.stats.centre);
            assert!((*to - *from - axis * axes.length).length() < 1e-6);
            assert_eq!(*colour, expected);
        }
    }
}
