//! Application assembly and the state both windows share.
//!
//! The session owns the cloud, index, selection and match log behind one
//! mutex. Window events are routed to the view owning the window and the
//! app is built once all startup loading has succeeded.

/// Bevy app construction: plugins, windows, cameras and frame systems.
pub mod app_setup;

/// Status line, key reminders and anchor caption.
pub mod overlay;

/// Shared session state, commit/undo/save actions and the stop signal.
pub mod session;

/// Per-window input routing.
pub mod views;
