//! K-d tree over the transformed cloud positions.
//!
//! Built once per loaded cloud and read-only afterwards, so a shared
//! reference can be queried from any thread while the renderer reads the
//! same cloud.

use bevy::prelude::*;
use thiserror::Error;

/// Points per leaf bucket. Small buckets keep radius queries tight.
const LEAF_SIZE: usize = 10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    #[error("cannot index an empty point set")]
    Empty,

    #[error("point {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

#[derive(Debug, Clone, Copy)]
enum KdNode {
    Leaf {
        start: usize,
        end: usize,
    },
    Split {
        dim: usize,
        value: f32,
        left: usize,
        right: usize,
    },
}

/// 3-dimensional nearest-neighbour index answering radius queries.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    points: Vec<[f32; 3]>,
    /// Permutation of point indices; leaves own contiguous ranges of it.
    order: Vec<usize>,
    nodes: Vec<KdNode>,
    root: usize,
}

impl SpatialIndex {
    /// One-time O(n log n) construction. Rejects empty or non-finite input.
    pub fn build(positions: &[Vec3]) -> Result<Self, IndexError> {
        if positions.is_empty() {
            return Err(IndexError::Empty);
        }
        if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
            return Err(IndexError::NonFinite { index });
        }

        let points: Vec<[f32; 3]> = positions.iter().map(|p| p.to_array()).collect();
        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(2 * points.len() / LEAF_SIZE + 1);
        let root = Self::build_recursive(&points, &mut order, 0, points.len(), 0, &mut nodes);

        Ok(Self {
            points,
            order,
            nodes,
            root,
        })
    }

    fn build_recursive(
        points: &[[f32; 3]],
        order: &mut [usize],
        start: usize,
        end: usize,
        depth: usize,
        nodes: &mut Vec<KdNode>,
    ) -> usize {
        if end - start <= LEAF_SIZE {
            nodes.push(KdNode::Leaf { start, end });
            return nodes.len() - 1;
        }

        let dim = depth % 3;
        let mid = start + (end - start) / 2;
        order[start..end]
            .select_nth_unstable_by(mid - start, |a, b| points[*a][dim].total_cmp(&points[*b][dim]));
        let value = points[order[mid]][dim];

        let left = Self::build_recursive(points, order, start, mid, depth + 1, nodes);
        let right = Self::build_recursive(points, order, mid, end, depth + 1, nodes);
        nodes.push(KdNode::Split {
            dim,
            value,
            left,
            right,
        });
        nodes.len() - 1
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Every indexed point within `radius` of `query`, as `(index, distance)`
    /// with true Euclidean distances. Order is unspecified.
    pub fn radius_query(&self, query: Vec3, radius: f32) -> Vec<(usize, f32)> {
        let mut results = Vec::new();
        if radius < 0.0 || !query.is_finite() {
            return results;
        }
        let q = query.to_array();
        let radius_sq = radius * radius;
        let mut stack = vec![self.root];

        while let Some(node) = stack.pop() {
            match self.nodes[node] {
                KdNode::Leaf { start, end } => {
                    for &i in &self.order[start..end] {
                        let d2 = distance_sq(&self.points[i], &q);
                        if d2 <= radius_sq {
                            results.push((i, d2.sqrt()));
                        }
                    }
                }
                KdNode::Split {
                    dim,
                    value,
                    left,
                    right,
                } => {
                    let diff = q[dim] - value;
                    let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                    if diff * diff <= radius_sq {
                        stack.push(far);
                    }
                    stack.push(near);
                }
            }
        }
        results
    }

    /// Closest indexed point to `query` and its distance.
    pub fn nearest(&self, query: Vec3) -> Option<(usize, f32)> {
        if !query.is_finite() {
            return None;
        }
        let q = query.to_array();
        let mut best: Option<(usize, f32)> = None;
        self.nearest_recursive(self.root, &q, &mut best);
        best.map(|(i, d2)| (i, d2.sqrt()))
    }

    fn nearest_recursive(&self, node: usize, q: &[f32; 3], best: &mut Option<(usize, f32)>) {
        match self.nodes[node] {
            KdNode::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    let d2 = distance_sq(&self.points[i], q);
                    if best.is_none_or(|(_, b)| d2 < b) {
                        *best = Some((i, d2));
                    }
                }
            }
            KdNode::Split {
                dim,
                value,
                left,
                right,
            } => {
                let diff = q[dim] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.nearest_recursive(near, q, best);
                if best.is_none_or(|(_, b)| diff * diff <= b) {
                    self.nearest_recursive(far, q, best);
                }
            }
        }
    }
}

#[inline]
fn distance_sq(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}
