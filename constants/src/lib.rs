//! Shared tunables for the PnP trainer engine.
//!
//! Values are grouped by the subsystem that consumes them so the viewer and
//! matcher windows read the same numbers.

/// Orbit camera increments, clamp factors and projection parameters.
pub mod camera;

/// Point colours, selection weights and point sizes used by the render bridge.
pub mod render_settings;

/// Picking radii, neighbourhood size and 2D feature selection settings.
pub mod selection;

/// Status message texts and display timeouts.
pub mod status;
