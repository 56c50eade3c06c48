use bevy::color::Color;
use std::time::Duration;

pub const MATCH_SAVED: &str = "Match saved (Ctrl-Backspace to undo)";
pub const MATCH_UNDONE: &str = "Last match undone";
pub const FILE_SAVED: &str = "Saved";
pub const FILE_NOT_SAVED: &str = "Not saved";
pub const PICKING_UNAVAILABLE: &str = "Picking unavailable";
pub const NOTHING_TO_COMMIT: &str = "Select a 3D point and at least one feature first";

pub const MATCH_SAVED_TIMEOUT: Duration = Duration::from_secs(10);
pub const MATCH_UNDONE_TIMEOUT: Duration = Duration::from_secs(8);
pub const SAVE_TIMEOUT: Duration = Duration::from_secs(10);
pub const ERROR_TIMEOUT: Duration = Duration::from_secs(15);

/// Colour of confirmations such as a committed or saved match.
pub const INFO_COLOUR: Color = Color::srgb(1.0, 1.0, 0.0);

/// Colour of neutral notices.
pub const NOTICE_COLOUR: Color = Color::srgb(1.0, 1.0, 1.0);

pub const ERROR_COLOUR: Color = Color::srgb(1.0, 0.0, 0.0);

/// Font size of status lines in both windows.
pub const STATUS_FONT_SIZE: f32 = 20.0;

/// Font size of the key reminder and anchor caption.
pub const HINT_FONT_SIZE: f32 = 14.0;

pub const HINT_COLOUR: Color = Color::srgb(0.7, 0.7, 0.7);

pub const VIEWER_HINT: &str = "Left drag: orbit  Wheel: zoom  Right click: pick point";
pub const MATCHER_HINT: &str =
    "Right click: toggle keypoint (Ctrl removes)  Left drag: box select  Enter: commit  Ctrl-Backspace: undo  Ctrl-S: save";
