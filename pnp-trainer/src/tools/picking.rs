use bevy::prelude::*;
use constants::selection::{MATCHER_PICK_RADIUS, PARALLEL_PICK_THRESHOLD, VIEWER_PICK_RADIUS};
use rayon::prelude::*;
use std::cmp::Ordering;

/// World-space ray from the eye through a cursor position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickRay {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

/// Candidate chosen by a pick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointHit {
    pub index: usize,
    /// Straight-line distance from the eye to the candidate centre.
    pub eye_distance: f32,
    pub position: Vec3,
}

impl PointHit {
    /// End points of the eye-to-hit segment, drawn as a debug line.
    pub fn segment(&self, ray: &PickRay) -> (Vec3, Vec3) {
        (ray.origin, ray.origin + ray.direction * self.eye_distance)
    }
}

/// Ray-sphere point picker.
///
/// Among every candidate whose sphere the ray line meets, the one nearest
/// the eye wins, not the one with the smallest ray parameter. A candidate
/// slightly off the ray but closer to the eye therefore beats one further
/// along that lies exactly on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickingEngine {
    /// Used as the squared radius term of the intersection test.
    pub search_radius: f32,
}

impl PickingEngine {
    pub const VIEWER: Self = Self {
        search_radius: VIEWER_PICK_RADIUS,
    };

    pub const MATCHER: Self = Self {
        search_radius: MATCHER_PICK_RADIUS,
    };

    pub fn new(search_radius: f32) -> Self {
        Self { search_radius }
    }

    /// Build the world ray for a cursor position in viewport pixels
    /// (origin top-left). Returns `None` for an empty viewport or a
    /// degenerate direction.
    pub fn unproject(cursor: Vec2, viewport: Vec2, inv_projection: &Mat4, inv_view: &Mat4) -> Option<PickRay> {
        if viewport.x <= 0.0 || viewport.y <= 0.0 {
            return None;
        }
        let x = 2.0 * cursor.x / viewport.x - 1.0;
        let y = 1.0 - 2.0 * cursor.y / viewport.y;

        let eye_ray = *inv_projection * Vec4::new(x, y, -1.0, 1.0);
        let eye_ray = Vec4::new(eye_ray.x, eye_ray.y, -1.0, 0.0);
        let world_ray = *inv_view * eye_ray;
        let direction = world_ray.truncate().try_normalize()?;
        let origin = inv_view.transform_point3(Vec3::ZERO);
        Some(PickRay { origin, direction })
    }

    /// Full pick: unproject the cursor and test every candidate except
    /// `exclude`. A miss is a normal `None`.
    pub fn pick(
        &self,
        cursor: Vec2,
        viewport: Vec2,
        inv_projection: &Mat4,
        inv_view: &Mat4,
        candidates: &[Vec3],
        exclude: Option<usize>,
    ) -> Option<(PointHit, PickRay)> {
        let ray = Self::unproject(cursor, viewport, inv_projection, inv_view)?;
        self.pick_along(&ray, candidates, exclude).map(|hit| (hit, ray))
    }

    /// Test candidates against an already built ray.
    pub fn pick_along(&self, ray: &PickRay, candidates: &[Vec3], exclude: Option<usize>) -> Option<PointHit> {
        let test = |(i, c): (usize, &Vec3)| -> Option<(usize, f32)> {
            if Some(i) == exclude {
                return None;
            }
            let oc = ray.origin - *c;
            let b = ray.direction.dot(oc);
            let cc = oc.dot(oc) - self.search_radius;
            if b * b - cc >= 0.0 {
                Some((i, ray.origin.distance(*c)))
            } else {
                None
            }
        };
        let nearer = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
        };

        let best = if candidates.len() >= PARALLEL_PICK_THRESHOLD {
            candidates
                .par_iter()
                .enumerate()
                .filter_map(test)
                .min_by(nearer)
        } else {
            candidates.iter().enumerate().filter_map(test).min_by(nearer)
        };

        best.map(|(index, eye_distance)| PointHit {
            index,
            eye_distance,
            position: candidates[index],
        })
    }
}
