use bevy::prelude::*;
use constants::camera::{
    ANGLE_INCREMENT, FOV_DEGREES, MATCHER_MIN_RADIUS_FACTOR, MAX_RADIUS_FACTOR, MIN_ORBIT_RADIUS,
    NEAR_PLANE, VIEWER_MIN_RADIUS_FACTOR, ZOOM_INCREMENT,
};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::engine::assets::bounds::BoundingStats;

/// Radius clamp and step sizes of an orbit camera.
///
/// The point cloud window and the matcher inset differ only in the radius
/// floor, so both use this one type with different presets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitLimits {
    pub r_min_factor: f32,
    pub r_max_factor: f32,
    pub angle_increment: f32,
    pub zoom_increment: f32,
}

impl OrbitLimits {
    pub const VIEWER: Self = Self {
        r_min_factor: VIEWER_MIN_RADIUS_FACTOR,
        r_max_factor: MAX_RADIUS_FACTOR,
        angle_increment: ANGLE_INCREMENT,
        zoom_increment: ZOOM_INCREMENT,
    };

    pub const MATCHER: Self = Self {
        r_min_factor: MATCHER_MIN_RADIUS_FACTOR,
        r_max_factor: MAX_RADIUS_FACTOR,
        angle_increment: ANGLE_INCREMENT,
        zoom_increment: ZOOM_INCREMENT,
    };
}

/// `fmod(angle + incr, max)` wrapped into `[0, max)`.
pub fn add_angle(angle: f32, incr: f32, max: f32) -> f32 {
    let wrapped = (angle + incr) % max;
    if wrapped < 0.0 { wrapped + max } else { wrapped }
}

/// -1, 0 or 1. Zero stays zero so a still cursor moves nothing.
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Spherical-coordinate camera placed on a sphere around the world origin
/// and looking at the cloud centre.
///
/// Eye position and up vector are recomputed eagerly on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    r: f32,
    phi: f32,
    theta: f32,
    r_min: f32,
    r_max: f32,
    limits: OrbitLimits,
    centre: Vec3,
    far: f32,
    eye: Vec3,
    tangent: Vec3,
}

impl OrbitCamera {
    /// Camera sized for a cloud: `r = max_r/2`, `phi = π/2`, `theta = 0`.
    pub fn for_bounds(stats: &BoundingStats, limits: OrbitLimits) -> Self {
        let max_r = stats.max_r();
        Self::new(
            stats.initial_radius(),
            max_r * limits.r_min_factor,
            max_r * limits.r_max_factor,
            stats.centre,
            stats.far_plane(),
            limits,
        )
    }

    /// `r_min` is raised to [`MIN_ORBIT_RADIUS`] so the view stays defined.
    pub fn new(r: f32, r_min: f32, r_max: f32, centre: Vec3, far: f32, limits: OrbitLimits) -> Self {
        let r_min = r_min.max(MIN_ORBIT_RADIUS);
        let mut camera = Self {
            r: r.clamp(r_min, r_max.max(r_min)),
            phi: FRAC_PI_2,
            theta: 0.0,
            r_min,
            r_max: r_max.max(r_min),
            limits,
            centre,
            far,
            eye: Vec3::ZERO,
            tangent: Vec3::Y,
        };
        camera.cartesian();
        camera
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn radius_range(&self) -> (f32, f32) {
        (self.r_min, self.r_max)
    }

    pub fn centre(&self) -> Vec3 {
        self.centre
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Up vector tangent to the orbit sphere at the eye.
    pub fn tangent(&self) -> Vec3 {
        self.tangent
    }

    /// Move the look-at point. Used when the matcher recentres on a pick.
    pub fn set_centre(&mut self, centre: Vec3) {
        self.centre = centre;
    }

    /// Replace the spherical state directly; values are wrapped and clamped.
    pub fn set_spherical(&mut self, r: f32, phi: f32, theta: f32) {
        self.r = r.clamp(self.r_min, self.r_max);
        self.phi = add_angle(phi, 0.0, PI);
        self.theta = add_angle(theta, 0.0, TAU);
        self.cartesian();
    }

    /// One drag step moves exactly one angle: theta when the horizontal
    /// delta dominates, phi otherwise.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let incr = self.limits.angle_increment;
        if dx.abs() >= dy.abs() {
            self.theta = add_angle(self.theta, sign(dx) * incr, TAU);
        } else {
            self.phi = add_angle(self.phi, sign(dy) * incr, PI);
        }
        self.cartesian();
    }

    pub fn zoom(&mut self, scroll_y: f32) {
        self.r = (self.r + sign(scroll_y) * self.limits.zoom_increment).clamp(self.r_min, self.r_max);
        self.cartesian();
    }

    fn cartesian(&mut self) {
        let (r, phi, theta) = (self.r, self.phi, self.theta);
        let x = r * phi.sin() * theta.sin();
        let y = r * phi.cos();
        let z = r * phi.sin() * theta.cos();
        self.eye = Vec3::new(x, y, z);

        let r2 = r * r;
        let tangent = if r2 > 0.0 {
            Vec3::new(-x * y / r2, 1.0 - y * y / r2, -y * z / r2)
        } else {
            Vec3::Y
        };
        // At the poles the projection of Y vanishes.
        self.tangent = tangent.try_normalize().unwrap_or(Vec3::Z);
    }

    /// Look-at view matrix (world to eye).
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.centre, self.tangent)
    }

    /// OpenGL-style perspective projection for the given aspect ratio.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(FOV_DEGREES.to_radians(), aspect.max(f32::EPSILON), NEAR_PLANE, self.far)
    }

    pub fn inverse_view(&self) -> Mat4 {
        self.view_matrix().inverse()
    }

    pub fn inverse_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect).inverse()
    }

    /// Bevy transform equivalent of [`view_matrix`](Self::view_matrix).
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.eye).looking_at(self.centre, self.tangent)
    }

    pub fn far_plane(&self) -> f32 {
        self.far
    }
}
