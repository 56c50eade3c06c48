//! Interactive matching between a point cloud and image keypoints.
//!
//! Two views share one session. The point cloud window picks a 3D point and
//! gathers its neighbourhood; the match window shows the image with its
//! keypoints on the left and the normalised neighbourhood on the right.
//!
//! ## Selection Flow
//!
//! ```text
//! Right click in the point cloud window
//!   └─> PickingEngine::pick()
//!       └─> SelectionSyncController::select_point()
//!           ├─> radius query on the spatial index
//!           └─> CompanionView::on_3d_point_selected()
//! Every frame, once the selection revision has moved
//!   └─> sync_match_panel
//!       └─> CompanionView::on_neighbourhood_changed()
//! Right click in the inset
//!   └─> SelectionSyncController::notify_external_anchor_change()
//! Enter
//!   └─> SelectionSyncController::commit_match() ─> MatchLog
//! Ctrl-S
//!   └─> MatchIo::save()
//! ```
//!
//! ## Keys
//!
//! Accepted from either window:
//! - `Enter`: commit the anchor with the selected keypoints
//! - `Ctrl-Backspace`: undo the last commit
//! - `Ctrl-S`: write every recorded match to the output file

/// Keypoints and descriptors of the image, with the 2D selection.
pub mod features;

/// JSON reading and writing of recorded matches.
pub mod match_io;

/// Ordered list of committed matches.
pub mod match_log;

/// Match window: image panel, keypoint selection and neighbourhood inset.
pub mod matcher;

/// Ray construction and nearest-hit search along a ray.
pub mod picking;

/// Anchor and neighbourhood selection, kept in step with the match window.
pub mod selection;

/// Point cloud window input.
pub mod viewer;
