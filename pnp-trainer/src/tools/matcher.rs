//! The match window: the image with its detected keypoints on the left and
//! an inset view of the current 3D neighbourhood on the right.
//!
//! [`MatchPanel`] is the window's model. It receives selection changes from
//! the point cloud window through [`CompanionView`] and owns the 2D feature
//! selection. [`MatcherView`] holds the window's input state, its inset
//! camera and the panel layout.

use bevy::prelude::*;
use constants::render_settings::{
    ANCHOR_WEIGHT, DEFAULT_POINT_COLOUR, DRAG_RECT_COLOUR, FEATURE_COLOUR, IMAGE_PANEL_MAX_FRACTION,
    MIN_FEATURE_MARKER_RADIUS, NEIGHBOUR_WEIGHT, SELECTED_FEATURE_COLOUR,
};
use constants::selection::{MAX_MATCH_POINTS, MIN_DRAG_RECT};

use super::features::{DetectorInfo, FeatureArena};
use super::match_log::MatchRecord;
use super::picking::{PickRay, PickingEngine};
use super::selection::{CompanionView, NeighbourPoint};
use crate::engine::assets::bounds::{BoundingStats, CentreMode};
use crate::engine::assets::point_cloud::PointTransform;
use crate::engine::camera::orbit_camera::{OrbitCamera, OrbitLimits};
use crate::engine::core::session::{SessionState, SharedSession};
use crate::engine::core::views::{Modifiers, ViewInput};
use crate::engine::render::vertex_buffer::PointVertex;

/// Extent of the inset once the neighbourhood is normalised.
const NORMALISED_BOUNDS: BoundingStats = BoundingStats {
    min: Vec3::NEG_ONE,
    max: Vec3::ONE,
    centre: Vec3::ZERO,
    centre_mode: CentreMode::Mean,
    point_count: 0,
};

/// One neighbourhood member as drawn in the inset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPoint {
    /// File-space coordinate, reported back when the point is picked.
    pub original: Vec3,
    /// Position inside the `[-1, 1]` cube.
    pub position: Vec3,
    pub distance: f32,
    pub anchor: bool,
}

/// `(a, b)` of the map `v * a + b` sending `min` to -1 and `max` to 1.
/// A flat axis maps everything to 0.
fn axis_map(min: f32, max: f32) -> (f32, f32) {
    let span = max - min;
    if !span.is_finite() || span.abs() <= f32::EPSILON {
        return (0.0, 0.0);
    }
    let a = 2.0 / span;
    (a, -1.0 - a * min)
}

/// Sort by distance (anchor first on ties), keep the nearest
/// [`MAX_MATCH_POINTS`] and normalise every axis to `[-1, 1]`.
pub fn normalise_neighbourhood(points: &[NeighbourPoint], transform: PointTransform) -> Vec<DisplayPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(b.anchor.cmp(&a.anchor)));
    sorted.truncate(MAX_MATCH_POINTS);

    let placed: Vec<Vec3> = sorted.iter().map(|p| transform.apply(p.original)).collect();
    let (min, max) = placed.iter().fold(
        (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        |(min, max), p| (min.min(*p), max.max(*p)),
    );
    let (ax, bx) = axis_map(min.x, max.x);
    let (ay, by) = axis_map(min.y, max.y);
    let (az, bz) = axis_map(min.z, max.z);
    let scale = Vec3::new(ax, ay, az);
    let offset = Vec3::new(bx, by, bz);

    sorted
        .iter()
        .zip(placed)
        .map(|(p, placed)| DisplayPoint {
            original: p.original,
            position: placed * scale + offset,
            distance: p.distance,
            anchor: p.anchor,
        })
        .collect()
}

/// State of the match window shared through the session.
#[derive(Debug, Clone)]
pub struct MatchPanel {
    pub features: FeatureArena,
    pub detector: Option<DetectorInfo>,
    transform: PointTransform,
    points: Vec<DisplayPoint>,
    /// Bumped whenever `points` changes.
    revision: u64,
    /// Bumped on every new pick in the point cloud window.
    generation: u64,
}

impl MatchPanel {
    pub fn new(features: FeatureArena, detector: Option<DetectorInfo>, transform: PointTransform) -> Self {
        Self {
            features,
            detector,
            transform,
            points: Vec::new(),
            revision: 0,
            generation: 0,
        }
    }

    pub fn points(&self) -> &[DisplayPoint] {
        &self.points
    }

    pub fn anchor(&self) -> Option<&DisplayPoint> {
        self.points.iter().find(|p| p.anchor)
    }

    fn anchor_index(&self) -> Option<usize> {
        self.points.iter().position(|p| p.anchor)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Caption shown next to the inset, the anchor in file coordinates.
    pub fn anchor_caption(&self) -> Option<String> {
        self.anchor()
            .map(|p| format!("{:.3}, {:.3}, {:.3}", p.original.x, p.original.y, p.original.z))
    }

    /// Inset point buffer: the anchor highlighted, every other member as a
    /// neighbour.
    pub fn vertices(&self) -> Vec<PointVertex> {
        self.points
            .iter()
            .map(|p| PointVertex {
                position: p.position.to_array(),
                selection: if p.anchor { ANCHOR_WEIGHT } else { NEIGHBOUR_WEIGHT },
                colour: DEFAULT_POINT_COLOUR,
            })
            .collect()
    }

    /// Member hit by `ray`, the current anchor excluded. Returns its file
    /// coordinate.
    pub fn pick_along(&self, picking: &PickingEngine, ray: &PickRay) -> Option<Vec3> {
        let positions: Vec<Vec3> = self.points.iter().map(|p| p.position).collect();
        let hit = picking.pick_along(ray, &positions, self.anchor_index())?;
        self.points.get(hit.index).map(|p| p.original)
    }
}

impl CompanionView for MatchPanel {
    fn on_3d_point_selected(&mut self, original: Vec3, recorded: Option<&MatchRecord>) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(record) = recorded {
            debug!(
                "Point {original} was matched before, restoring {} features",
                record.features_2d.len()
            );
            self.features.set_selection(&record.features_2d);
        }
    }

    fn on_neighbourhood_changed(&mut self, points: &[NeighbourPoint]) {
        self.points = normalise_neighbourhood(points, self.transform);
        self.revision = self.revision.wrapping_add(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    Orbit { from: Vec2 },
    Rect { start: Vec2 },
}

/// Input state and layout of the match window.
#[derive(Resource, Debug, Clone)]
pub struct MatcherView {
    camera: OrbitCamera,
    home: OrbitCamera,
    picking: PickingEngine,
    window: Vec2,
    image_size: Vec2,
    cursor: Vec2,
    drag: Option<Drag>,
    click_radius: f32,
    best_only: bool,
    seen_generation: u64,
    seen_revision: u64,
}

impl MatcherView {
    pub fn new(image_size: Vec2, window: Vec2, click_radius: f32, best_only: bool) -> Self {
        let camera = OrbitCamera::for_bounds(&NORMALISED_BOUNDS, OrbitLimits::MATCHER);
        Self {
            home: camera.clone(),
            camera,
            picking: PickingEngine::MATCHER,
            window,
            image_size,
            cursor: Vec2::ZERO,
            drag: None,
            click_radius,
            best_only,
            seen_generation: 0,
            seen_revision: 0,
        }
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn window_size(&self) -> Vec2 {
        self.window
    }

    /// Width of the image panel, at most a fixed share of the window.
    pub fn image_panel_width(&self) -> f32 {
        self.image_size.x.min(self.window.x * IMAGE_PANEL_MAX_FRACTION).max(0.0)
    }

    /// Logical-pixel rectangle of the inset.
    pub fn inset_rect(&self) -> Rect {
        Rect::new(self.image_panel_width(), 0.0, self.window.x.max(self.image_panel_width()), self.window.y)
    }

    pub fn in_inset(&self, position: Vec2) -> bool {
        position.x > self.image_panel_width()
    }

    pub fn inset_aspect(&self) -> f32 {
        let size = self.inset_rect().size();
        if size.y > 0.0 { size.x / size.y } else { 1.0 }
    }

    /// Rectangle being dragged over the image, in image pixels.
    pub fn drag_rect(&self) -> Option<Rect> {
        match self.drag {
            Some(Drag::Rect { start }) => Some(Rect::from_corners(start, self.clamp_to_image(self.cursor))),
            _ => None,
        }
    }

    fn clamp_to_image(&self, position: Vec2) -> Vec2 {
        Vec2::new(position.x.min(self.image_panel_width()), position.y)
    }

    /// Follow the panel: a new pick resets the inset camera, any change of
    /// members recentres it on the anchor.
    pub fn follow_panel(&mut self, panel: &MatchPanel) {
        if panel.generation() != self.seen_generation {
            self.seen_generation = panel.generation();
            self.camera = self.home.clone();
        }
        if panel.revision() != self.seen_revision {
            self.seen_revision = panel.revision();
            let centre = panel.anchor().map_or(Vec3::ZERO, |p| p.position);
            self.camera.set_centre(centre);
        }
    }

    /// Pick in the inset and move the anchor of the point cloud selection
    /// to the hit member. Returns whether the anchor moved.
    pub fn pick_3d(&mut self, session: &mut SessionState) -> bool {
        let inset = self.inset_rect();
        let local = self.cursor - inset.min;
        let ray = PickingEngine::unproject(
            local,
            inset.size(),
            &self.camera.inverse_projection(self.inset_aspect()),
            &self.camera.inverse_view(),
        );
        let Some(original) = ray.and_then(|ray| session.panel.pick_along(&self.picking, &ray)) else {
            return false;
        };
        session.controller.notify_external_anchor_change(original, &session.cloud)
    }

    fn finish_rect(&mut self, session: &mut SessionState, start: Vec2, deselect: bool) {
        let rect = Rect::from_corners(start, self.clamp_to_image(self.cursor));
        let size = rect.size();
        if size.x < MIN_DRAG_RECT || size.y < MIN_DRAG_RECT {
            return;
        }
        if session.panel.features.select_rect(rect.min, rect.max, deselect) {
            debug!("Rectangle {:?} changed the feature selection", rect);
        }
    }
}

impl ViewInput for MatcherView {
    fn on_cursor(&mut self, _session: &mut SessionState, position: Vec2) {
        self.cursor = position;
        if let Some(Drag::Orbit { from }) = self.drag {
            let delta = position - from;
            self.camera.rotate(delta.x, delta.y);
            self.drag = Some(Drag::Orbit { from: position });
        }
    }

    fn on_button(
        &mut self,
        session: &mut SessionState,
        button: MouseButton,
        pressed: bool,
        modifiers: Modifiers,
    ) {
        match (button, pressed) {
            (MouseButton::Right, true) => {
                if self.in_inset(self.cursor) {
                    self.pick_3d(session);
                } else {
                    session
                        .panel
                        .features
                        .click(self.cursor, self.click_radius, modifiers.ctrl, self.best_only);
                }
            }
            (MouseButton::Left, true) => {
                self.drag = Some(if self.in_inset(self.cursor) {
                    Drag::Orbit { from: self.cursor }
                } else {
                    Drag::Rect { start: self.cursor }
                });
            }
            (MouseButton::Left, false) => {
                if let Some(Drag::Rect { start }) = self.drag.take() {
                    self.finish_rect(session, start, modifiers.ctrl);
                }
            }
            _ => {}
        }
    }

    fn on_scroll(&mut self, _session: &mut SessionState, delta: Vec2) {
        if self.in_inset(self.cursor) {
            self.camera.zoom(delta.y);
        }
    }

    fn on_resize(&mut self, size: Vec2) {
        self.window = size;
    }
}

/// Push selection changes of the point cloud window into the panel and let
/// the inset camera follow.
pub fn sync_match_panel(
    session: Res<SharedSession>,
    mut matcher: ResMut<MatcherView>,
    mut pushed: Local<Option<u64>>,
) {
    let mut guard = session.lock();
    let state = &mut *guard;
    let revision = state.controller.revision();
    if *pushed != Some(revision) {
        let points = state.controller.neighbourhood_points(&state.cloud);
        state.panel.on_neighbourhood_changed(&points);
        *pushed = Some(revision);
    }
    matcher.follow_panel(&state.panel);
}

/// Keypoint markers and the drag rectangle, drawn over the image.
#[derive(Default, Reflect, GizmoConfigGroup)]
pub struct ImageGizmos;

/// Image pixel to image panel world position. The image sprite is anchored
/// at its top-left corner on the origin with y pointing up.
pub fn image_to_world(p: Vec2) -> Vec2 {
    Vec2::new(p.x, -p.y)
}

pub fn draw_image_overlay(
    session: Res<SharedSession>,
    matcher: Res<MatcherView>,
    mut gizmos: Gizmos<ImageGizmos>,
) {
    let state = session.lock();
    for (handle, feature) in state.panel.features.iter() {
        let colour = if state.panel.features.is_selected(handle) {
            SELECTED_FEATURE_COLOUR
        } else {
            FEATURE_COLOUR
        };
        let radius = (feature.keypoint.size * 0.5).max(MIN_FEATURE_MARKER_RADIUS);
        gizmos.circle_2d(
            Isometry2d::from_translation(image_to_world(feature.keypoint.position())),
            radius,
            colour,
        );
    }
    if let Some(rect) = matcher.drag_rect() {
        gizmos.rect_2d(
            Isometry2d::from_translation(image_to_world(rect.center())),
            rect.size(),
            DRAG_RECT_COLOUR,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::loading::point_cloud_loader::LoadedCloud;
    use crate::engine::assets::point_cloud::PointCloud;
    use crate::tools::features::{Descriptor, Feature, FeatureHandle, KeyPoint};
    use crate::tools::picking::PointHit;
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    const WINDOW: Vec2 = Vec2::new(1024.0, 768.0);
    const IMAGE: Vec2 = Vec2::new(400.0, 300.0);

    fn neighbour(x: f32, y: f32, z: f32, distance: f32, anchor: bool) -> NeighbourPoint {
        NeighbourPoint {
            original: Vec3::new(x, y, z),
            distance,
            anchor,
        }
    }

    fn feature(x: f32, y: f32) -> Feature {
        Feature {
            keypoint: KeyPoint::at(x, y),
            descriptor: Descriptor {
                mat_type: 5,
                rows: 1,
                cols: 1,
                data: vec![1.0],
            },
        }
    }

    fn session() -> SessionState {
        let points = [
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
            Vec3::new(10.0, 0.0, 0.0),
        ];
        let cloud = PointCloud::from_points(PointTransform::default(), &points);
        let loaded = LoadedCloud::from_cloud(cloud, CentreMode::Mean).expect("non-empty cloud");
        let features = FeatureArena::new(vec![feature(10.0, 10.0), feature(50.0, 50.0)]);
        let panel = MatchPanel::new(features, None, PointTransform::default());
        SessionState::new(loaded, panel, PathBuf::from("unused.json"))
    }

    fn pick_origin(state: &mut SessionState) {
        let SessionState {
            cloud,
            index,
            controller,
            panel,
            ..
        } = state;
        let index = index.as_ref().expect("index");
        let hit = PointHit {
            index: 0,
            eye_distance: 5.0,
            position: Vec3::ZERO,
        };
        controller.select_point(&hit, cloud, index, panel);
        let points = controller.neighbourhood_points(cloud);
        panel.on_neighbourhood_changed(&points);
    }

    #[test]
    fn neighbourhood_spans_the_unit_cube() {
        let points = [
            neighbour(2.0, 5.0, 7.0, 0.0, true),
            neighbour(4.0, 5.0, 9.0, 2.0, false),
            neighbour(3.0, 5.0, 8.0, 1.0, false),
        ];
        let shown = normalise_neighbourhood(&points, PointTransform::default());

        assert!(shown[0].anchor);
        assert_eq!(shown[1].distance, 1.0);
        assert_abs_diff_eq!(shown[0].position.x, -1.0);
        assert_abs_diff_eq!(shown[1].position.x, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(shown[2].position.z, 1.0);
        // Every point shares y, so that axis collapses to 0.
        assert!(shown.iter().all(|p| p.position.y == 0.0));
    }

    #[test]
    fn neighbourhood_is_truncated_to_the_nearest() {
        let points: Vec<NeighbourPoint> = (0..30)
            .rev()
            .map(|i| neighbour(i as f32, 0.0, 0.0, i as f32, i == 0))
            .collect();
        let shown = normalise_neighbourhood(&points, PointTransform::default());
        assert_eq!(shown.len(), MAX_MATCH_POINTS);
        assert!(shown[0].anchor);
        assert_eq!(shown.last().map(|p| p.distance), Some(19.0));
    }

    #[test]
    fn flipped_clouds_normalise_in_display_space() {
        let points = [
            neighbour(0.0, 1.0, 0.0, 0.0, true),
            neighbour(0.0, 3.0, 0.0, 2.0, false),
        ];
        let shown = normalise_neighbourhood(&points, PointTransform::new(1.0, true));
        // y is negated before normalising, so the larger file y ends up at -1.
        assert_abs_diff_eq!(shown[0].position.y, 1.0);
        assert_abs_diff_eq!(shown[1].position.y, -1.0);
        assert_eq!(shown[1].original, Vec3::new(0.0, 3.0, 0.0));
    }

    #[test]
    fn earlier_match_restores_its_features() {
        let mut panel = MatchPanel::new(
            FeatureArena::new(vec![feature(1.0, 1.0), feature(2.0, 2.0)]),
            None,
            PointTransform::default(),
        );
        let record = MatchRecord {
            point_3d: Vec3::ONE,
            features_2d: vec![FeatureHandle(1)],
        };
        panel.on_3d_point_selected(Vec3::ONE, Some(&record));
        assert_eq!(panel.features.selected(), &[FeatureHandle(1)]);
        assert_eq!(panel.generation(), 1);

        panel.on_3d_point_selected(Vec3::ZERO, None);
        assert_eq!(panel.features.selected(), &[FeatureHandle(1)]);
    }

    #[test]
    fn panel_width_is_capped() {
        let view = MatcherView::new(Vec2::new(2000.0, 300.0), WINDOW, 5.0, false);
        assert_abs_diff_eq!(view.image_panel_width(), WINDOW.x * IMAGE_PANEL_MAX_FRACTION);
        let view = MatcherView::new(IMAGE, WINDOW, 5.0, false);
        assert_eq!(view.image_panel_width(), 400.0);
        assert!(view.in_inset(Vec2::new(401.0, 10.0)));
        assert!(!view.in_inset(Vec2::new(400.0, 10.0)));
    }

    #[test]
    fn right_click_and_rectangle_select_features() {
        let mut state = session();
        let mut view = MatcherView::new(IMAGE, WINDOW, 5.0, false);
        let none = Modifiers::default();
        let ctrl = Modifiers { ctrl: true, shift: false };

        view.on_cursor(&mut state, Vec2::new(11.0, 9.0));
        view.on_button(&mut state, MouseButton::Right, true, none);
        assert_eq!(state.panel.features.selected(), &[FeatureHandle(0)]);
        view.on_button(&mut state, MouseButton::Right, true, ctrl);
        assert!(state.panel.features.selected().is_empty());

        // Too small to count as a rectangle.
        view.on_cursor(&mut state, Vec2::new(8.0, 8.0));
        view.on_button(&mut state, MouseButton::Left, true, none);
        view.on_cursor(&mut state, Vec2::new(11.0, 11.0));
        view.on_button(&mut state, MouseButton::Left, false, none);
        assert!(state.panel.features.selected().is_empty());

        view.on_cursor(&mut state, Vec2::new(60.0, 60.0));
        view.on_button(&mut state, MouseButton::Left, true, none);
        view.on_cursor(&mut state, Vec2::new(5.0, 5.0));
        assert!(view.drag_rect().is_some());
        view.on_button(&mut state, MouseButton::Left, false, none);
        assert_eq!(state.panel.features.selected().len(), 2);
        assert!(view.drag_rect().is_none());
    }

    #[test]
    fn inset_pick_moves_the_anchor() {
        let mut state = session();
        pick_origin(&mut state);
        assert_eq!(state.panel.points().len(), 4);

        let mut view = MatcherView::new(IMAGE, WINDOW, 5.0, false);
        view.follow_panel(&state.panel);
        let anchor = state.panel.anchor().expect("anchor").position;
        assert_eq!(view.camera().centre(), anchor);

        let target = state
            .panel
            .points()
            .iter()
            .find(|p| p.original == Vec3::X)
            .expect("x member")
            .position;
        let camera = view.camera();
        let clip = camera.projection_matrix(view.inset_aspect()) * camera.view_matrix() * target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        let inset = view.inset_rect();
        let cursor = inset.min
            + Vec2::new((ndc.x + 1.0) * 0.5 * inset.width(), (1.0 - ndc.y) * 0.5 * inset.height());

        view.on_cursor(&mut state, cursor);
        view.on_button(&mut state, MouseButton::Right, true, Modifiers::default());
        assert_eq!(state.controller.selection().anchor(), Some(1));
        // The previous anchor keeps its membership.
        assert!(state.controller.selection().contains(0));
    }

    #[test]
    fn fully_zoomed_inset_still_unprojects() {
        let mut state = session();
        pick_origin(&mut state);
        let mut view = MatcherView::new(IMAGE, WINDOW, 5.0, false);
        view.follow_panel(&state.panel);

        let centre = view.inset_rect().center();
        view.on_cursor(&mut state, centre);
        for _ in 0..200 {
            view.on_scroll(&mut state, Vec2::new(0.0, -1.0));
        }
        assert!(view.camera().r() > 0.0);

        let inset = view.inset_rect();
        let ray = PickingEngine::unproject(
            centre - inset.min,
            inset.size(),
            &view.camera().inverse_projection(view.inset_aspect()),
            &view.camera().inverse_view(),
        );
        assert!(ray.is_some());
    }
}
