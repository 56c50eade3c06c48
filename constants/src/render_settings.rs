use bevy::color::Color;

/// Selection channel value of the anchor vertex.
pub const ANCHOR_WEIGHT: f32 = 0.0;

/// Selection channel value of a neighbourhood member.
pub const NEIGHBOUR_WEIGHT: f32 = 1.0;

/// Selection channel value of a vertex outside the selection.
pub const UNSELECTED_WEIGHT: f32 = -1.0;

/// Colour of points whose source file carries no colour channels.
pub const DEFAULT_POINT_COLOUR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];

/// Default point size in pixels for the point cloud window.
pub const DEFAULT_VIEWER_POINT_SIZE: f32 = 2.0;

/// Point size in pixels for the matcher inset.
pub const MATCHER_POINT_SIZE: f32 = 20.0;

pub const ANCHOR_COLOUR: Color = Color::srgb(0.1, 1.0, 0.1);
pub const NEIGHBOUR_COLOUR: Color = Color::srgb(1.0, 1.0, 0.0);

pub const FEATURE_COLOUR: Color = Color::srgb(0.2, 0.6, 1.0);
pub const SELECTED_FEATURE_COLOUR: Color = Color::srgb(1.0, 0.2, 0.2);
pub const DRAG_RECT_COLOUR: Color = Color::srgb(1.0, 1.0, 1.0);

/// Colour of the debug line drawn from the eye to the last pick.
pub const PICK_RAY_COLOUR: Color = Color::srgb(1.0, 1.0, 1.0);

/// Colours of the X, Y and Z axes drawn through the cloud centre.
pub const AXIS_COLOURS: [Color; 3] = [
    Color::srgb(1.0, 0.0, 0.0),
    Color::srgb(0.0, 1.0, 0.0),
    Color::srgb(0.0, 0.0, 1.0),
];

pub const WINDOW_WIDTH: f32 = 1024.0;
pub const WINDOW_HEIGHT: f32 = 768.0;

/// Largest share of the match window given to the image panel. The rest
/// shows the neighbourhood inset.
pub const IMAGE_PANEL_MAX_FRACTION: f32 = 0.65;

/// Smallest radius in pixels a keypoint marker is drawn with.
pub const MIN_FEATURE_MARKER_RADIUS: f32 = 3.0;

pub const BACKGROUND_COLOUR: Color = Color::srgb(0.05, 0.05, 0.08);

/// Render layer of the point cloud window.
pub const VIEWER_LAYER: usize = 0;

/// Render layer of the neighbourhood inset in the match window.
pub const INSET_LAYER: usize = 1;

/// Render layer of the image panel, its keypoint markers and drag rectangle.
pub const IMAGE_LAYER: usize = 2;

pub const VIEWER_WINDOW_TITLE: &str = "PointCloud";
pub const MATCH_WINDOW_TITLE: &str = "Match";
