//! In-memory point cloud data.
//!
//! Holds the transformed and original positions with per-point colours, and
//! the bounding statistics the cameras are fitted to.

/// Bounding box, centre and orbit radius statistics.
pub mod bounds;

/// Point storage and the scale/flip transform applied on load.
pub mod point_cloud;
