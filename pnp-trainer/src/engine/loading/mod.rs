//! Startup file loading.
//!
//! Reads PLY (ASCII or binary) and LAS/LAZ files into a [`PointCloud`](crate::engine::assets::point_cloud::PointCloud),
//! computing bounding statistics in the same pass and building the spatial
//! index once the points are in memory. Also decodes the match window image.

/// Load failures and recoverable colour warnings.
pub mod error;

/// Synchronous decoding of the match window image.
pub mod image_loader;

/// LAS/LAZ reader helpers.
pub mod las_loader;

/// Loader entry point dispatching on file extension.
pub mod point_cloud_loader;

/// PLY header inspection and vertex payload parsing.
pub mod ply_loader;

/// Terminal progress reporting while points are read.
pub mod progress;
