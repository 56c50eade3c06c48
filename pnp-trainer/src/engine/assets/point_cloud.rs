use bevy::prelude::*;

/// Scale and optional Y/Z flip applied to coordinates as they are read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointTransform {
    pub scale: f32,
    pub flip_yz: bool,
}

impl Default for PointTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            flip_yz: false,
        }
    }
}

impl PointTransform {
    pub fn new(scale: f32, flip_yz: bool) -> Self {
        Self { scale, flip_yz }
    }

    /// -1 when the Y and Z axes are flipped, 1 otherwise.
    pub fn flip(&self) -> f32 {
        if self.flip_yz { -1.0 } else { 1.0 }
    }

    /// Map a file-space coordinate into scaled world space. X is never flipped.
    ///
    /// This is the only place the forward transform is computed, so a point
    /// re-transformed from its original coordinates is bit-identical to the
    /// loaded one.
    pub fn apply(&self, p: Vec3) -> Vec3 {
        let flip = self.flip();
        Vec3::new(p.x * self.scale, p.y * self.scale * flip, p.z * self.scale * flip)
    }

    /// Inverse of [`apply`](Self::apply), up to float rounding.
    pub fn invert(&self, p: Vec3) -> Vec3 {
        let flip = self.flip();
        Vec3::new(p.x / self.scale, p.y * flip / self.scale, p.z * flip / self.scale)
    }
}

/// In-memory point source owned by one viewer session.
///
/// Holds the raw file coordinates next to the transformed ones so match
/// records can be written in the file's coordinate frame without rounding.
/// Replaced wholesale on reload.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    originals: Vec<Vec3>,
    positions: Vec<Vec3>,
    colours: Vec<[f32; 4]>,
    transform: PointTransform,
}

impl PointCloud {
    pub fn with_capacity(transform: PointTransform, capacity: usize, coloured: bool) -> Self {
        Self {
            originals: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            colours: Vec::with_capacity(if coloured { capacity } else { 0 }),
            transform,
        }
    }

    /// Append a point read from file, returning its transformed position.
    pub(crate) fn push(&mut self, original: Vec3, colour: Option<[f32; 4]>) -> Vec3 {
        let position = self.transform.apply(original);
        self.originals.push(original);
        self.positions.push(position);
        if let Some(c) = colour {
            self.colours.push(c);
        }
        position
    }

    /// Drop colours unless every point carries one.
    pub(crate) fn settle_colours(&mut self) {
        if self.colours.len() != self.positions.len() {
            self.colours.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn transform(&self) -> PointTransform {
        self.transform
    }

    /// Transformed position of point `i`.
    pub fn position(&self, i: usize) -> Option<Vec3> {
        self.positions.get(i).copied()
    }

    /// Raw file coordinate of point `i`.
    pub fn original(&self, i: usize) -> Option<Vec3> {
        self.originals.get(i).copied()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn colour(&self, i: usize) -> Option<[f32; 4]> {
        self.colours.get(i).copied()
    }

    pub fn has_colours(&self) -> bool {
        !self.colours.is_empty()
    }

    /// Build a cloud directly from file-space points, used by tests and tools
    /// that already hold coordinates in memory.
    pub fn from_points(transform: PointTransform, points: &[Vec3]) -> Self {
        let mut cloud = Self::with_capacity(transform, points.len(), false);
        for p in points {
            cloud.push(*p, None);
        }
        cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_never_touches_x() {
        let t = PointTransform::new(2.0, true);
        let p = t.apply(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p, Vec3::new(2.0, -4.0, -6.0));
    }

    #[test]
    fn partial_colours_are_dropped() {
        let mut cloud = PointCloud::with_capacity(PointTransform::default(), 2, true);
        cloud.push(Vec3::ZERO, Some([1.0; 4]));
        cloud.push(Vec3::ONE, None);
        cloud.settle_colours();
        assert!(!cloud.has_colours());
        assert_eq!(cloud.len(), 2);
    }

    #[test]
    fn originals_survive_the_transform() {
        let cloud = PointCloud::from_points(PointTransform::new(0.1, true), &[Vec3::new(3.3, 4.4, 5.5)]);
        assert_eq!(cloud.original(0), Some(Vec3::new(3.3, 4.4, 5.5)));
        assert_eq!(cloud.position(0), Some(PointTransform::new(0.1, true).apply(Vec3::new(3.3, 4.4, 5.5))));
    }
}
