//! Orbit camera model shared by the point cloud window and the matcher inset.
//!
//! Spherical coordinates with an eagerly derived eye position and a tangent
//! up vector, plus the Bevy systems that mirror the model onto window cameras.

/// Spherical orbit camera with radius clamping and angle wrapping.
pub mod orbit_camera;

/// Systems copying orbit camera state onto Bevy camera entities.
pub mod camera_sync;
