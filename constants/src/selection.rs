/// Squared sphere radius for ray picks in the point cloud window.
pub const VIEWER_PICK_RADIUS: f32 = 0.25;

/// Squared sphere radius for ray picks in the matcher inset.
pub const MATCHER_PICK_RADIUS: f32 = 0.5;

/// Radius of the neighbourhood gathered around a picked point.
pub const NEIGHBOURHOOD_RADIUS: f32 = 3.0;

/// Per-axis tolerance when matching coordinates reported by the matcher.
pub const COORDINATE_EPSILON: f32 = 1e-6;

/// Maximum number of neighbourhood points shown in the matcher inset.
pub const MAX_MATCH_POINTS: usize = 20;

/// Default click radius in pixels for selecting 2D features.
pub const DEFAULT_CLICK_RADIUS: f32 = 5.0;

/// Smallest accepted click radius.
pub const MIN_CLICK_RADIUS: f32 = 1.0;

/// Minimum width and height in pixels of a rectangle drag selection.
pub const MIN_DRAG_RECT: f32 = 5.0;

/// Point count above which the pick scan is split across the rayon pool.
pub const PARALLEL_PICK_THRESHOLD: usize = 50_000;

/// Default output file for saved matches.
pub const DEFAULT_MATCH_FILE: &str = "matches.json";
