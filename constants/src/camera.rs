/// Angle added to theta or phi for a single drag event (0.05 degrees).
pub const ANGLE_INCREMENT: f32 = 0.05 * std::f32::consts::PI / 180.0;

/// Distance added to the orbit radius per scroll notch.
pub const ZOOM_INCREMENT: f32 = 0.2;

/// Viewer orbit radius floor as a fraction of the bounding diagonal.
pub const VIEWER_MIN_RADIUS_FACTOR: f32 = 1.0 / 6.0;

/// Matcher orbit radius floor. The matcher zooms down to `MIN_ORBIT_RADIUS`.
pub const MATCHER_MIN_RADIUS_FACTOR: f32 = 0.0;

/// Absolute orbit radius floor. The eye never reaches the centre it looks at.
pub const MIN_ORBIT_RADIUS: f32 = 1.0e-3;

/// Orbit radius ceiling as a multiple of the bounding diagonal.
pub const MAX_RADIUS_FACTOR: f32 = 1.5;

/// Starting orbit radius as a fraction of the bounding diagonal.
pub const INITIAL_RADIUS_FACTOR: f32 = 0.5;

/// Vertical field of view in degrees.
pub const FOV_DEGREES: f32 = 45.0;

pub const NEAR_PLANE: f32 = 0.01;

/// Far plane is this multiple of the z range of the cloud.
pub const FAR_PLANE_RANGE_FACTOR: f32 = 3.0;

/// Smallest far plane used for flat clouds.
pub const MIN_FAR_PLANE: f32 = 1.0;
