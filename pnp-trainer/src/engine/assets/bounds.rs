use bevy::prelude::*;
use constants::camera::{FAR_PLANE_RANGE_FACTOR, INITIAL_RADIUS_FACTOR, MIN_FAR_PLANE};

/// How the look-at centre of a loaded cloud is derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CentreMode {
    /// Coordinate-wise arithmetic mean.
    Mean,
    /// Coordinate-wise median (upper median for an even count).
    #[default]
    Median,
}

/// Axis-aligned extents and centre of a loaded cloud in scaled world space.
/// Computed once per load and never mutated afterwards.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct BoundingStats {
    pub min: Vec3,
    pub max: Vec3,
    pub centre: Vec3,
    pub centre_mode: CentreMode,
    pub point_count: usize,
}

impl BoundingStats {
    /// Per-axis extent, `|max - min|`.
    pub fn range(&self) -> Vec3 {
        (self.max - self.min).abs()
    }

    /// Bounding diagonal used to size the orbit camera.
    pub fn max_r(&self) -> f32 {
        self.range().length()
    }

    /// Orbit radius a fresh camera starts at.
    pub fn initial_radius(&self) -> f32 {
        self.max_r() * INITIAL_RADIUS_FACTOR
    }

    /// Far clipping plane for the perspective projection.
    pub fn far_plane(&self) -> f32 {
        (self.range().z * FAR_PLANE_RANGE_FACTOR).max(MIN_FAR_PLANE)
    }
}

/// Single-pass min/max and centre tracker fed while points are read.
///
/// Mean centring keeps running sums only. Median centring buffers every
/// coordinate and selects the middle element per axis at the end.
#[derive(Debug, Clone)]
pub struct BoundsAccumulator {
    min: Vec3,
    max: Vec3,
    sums: [f64; 3],
    count: usize,
    mode: CentreMode,
    xs: Vec<f32>,
    ys: Vec<f32>,
    zs: Vec<f32>,
}

impl BoundsAccumulator {
    /// Create a tracker with bounds initialised to infinity values.
    pub fn new(mode: CentreMode, expected: usize) -> Self {
        let capacity = if mode == CentreMode::Median { expected } else { 0 };
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
            sums: [0.0; 3],
            count: 0,
            mode,
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
            zs: Vec::with_capacity(capacity),
        }
    }

    pub fn update(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
        self.count += 1;
        match self.mode {
            CentreMode::Mean => {
                self.sums[0] += p.x as f64;
                self.sums[1] += p.y as f64;
                self.sums[2] += p.z as f64;
            }
            CentreMode::Median => {
                self.xs.push(p.x);
                self.ys.push(p.y);
                self.zs.push(p.z);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Finalise into stats. Returns `None` when no point was seen.
    pub fn finish(mut self) -> Option<BoundingStats> {
        if self.count == 0 {
            return None;
        }
        let centre = match self.mode {
            CentreMode::Mean => {
                let n = self.count as f64;
                Vec3::new(
                    (self.sums[0] / n) as f32,
                    (self.sums[1] / n) as f32,
                    (self.sums[2] / n) as f32,
                )
            }
            CentreMode::Median => Vec3::new(
                median(&mut self.xs),
                median(&mut self.ys),
                median(&mut self.zs),
            ),
        };
        Some(BoundingStats {
            min: self.min,
            max: self.max,
            centre,
            centre_mode: self.mode,
            point_count: self.count,
        })
    }
}

/// Selection-based median, O(n) expected. Caller guarantees a non-empty slice.
fn median(values: &mut [f32]) -> f32 {
    let mid = values.len() / 2;
    let (_, m, _) = values.select_nth_unstable_by(mid, f32::total_cmp);
    *m
}
