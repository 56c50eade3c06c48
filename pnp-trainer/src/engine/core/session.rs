use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bevy::prelude::*;
use constants::status::{
    ERROR_COLOUR, ERROR_TIMEOUT, FILE_NOT_SAVED, FILE_SAVED, INFO_COLOUR, MATCH_SAVED,
    MATCH_SAVED_TIMEOUT, MATCH_UNDONE, MATCH_UNDONE_TIMEOUT, NOTHING_TO_COMMIT, NOTICE_COLOUR,
    SAVE_TIMEOUT,
};

use super::views::Modifiers;
use crate::engine::assets::bounds::BoundingStats;
use crate::engine::assets::point_cloud::PointCloud;
use crate::engine::loading::point_cloud_loader::LoadedCloud;
use crate::engine::spatial_index::{IndexError, SpatialIndex};
use crate::engine::status::StatusBoard;
use crate::tools::match_io::{JsonMatchIo, MatchIo};
use crate::tools::matcher::MatchPanel;
use crate::tools::selection::SelectionSyncController;

/// Everything both windows read and mutate. Owned by [`SharedSession`].
pub struct SessionState {
    pub cloud: PointCloud,
    pub stats: BoundingStats,
    /// `Err` when the index could not be built. Picking is then unavailable
    /// but the cloud is still drawn.
    pub index: Result<SpatialIndex, IndexError>,
    pub controller: SelectionSyncController,
    pub panel: MatchPanel,
    pub status: StatusBoard,
    /// App clock at the start of the current frame.
    pub now: Duration,
    pub output: PathBuf,
    pub match_io: JsonMatchIo,
}

impl SessionState {
    pub fn new(loaded: LoadedCloud, panel: MatchPanel, output: PathBuf) -> Self {
        Self {
            cloud: loaded.cloud,
            stats: loaded.stats,
            index: loaded.index,
            controller: SelectionSyncController::default(),
            panel,
            status: StatusBoard::default(),
            now: Duration::ZERO,
            output,
            match_io: JsonMatchIo::default(),
        }
    }

    fn notify(&mut self, text: impl Into<String>, colour: Color, timeout: Duration) {
        let now = self.now;
        self.status.post(text, colour, timeout, now);
    }

    /// Record the anchor with the selected features. Returns whether a match
    /// was committed.
    pub fn commit_match(&mut self) -> bool {
        let features = self.panel.features.selected().to_vec();
        match self.controller.commit_match(&features, &self.cloud) {
            Ok(_) => {
                self.panel.features.clear_selection();
                self.notify(MATCH_SAVED, INFO_COLOUR, MATCH_SAVED_TIMEOUT);
                true
            }
            Err(reason) => {
                debug!("Commit refused: {reason}");
                self.notify(NOTHING_TO_COMMIT, NOTICE_COLOUR, MATCH_SAVED_TIMEOUT);
                false
            }
        }
    }

    pub fn undo_last_match(&mut self) -> bool {
        if self.controller.undo_last().is_none() {
            return false;
        }
        self.notify(MATCH_UNDONE, INFO_COLOUR, MATCH_UNDONE_TIMEOUT);
        true
    }

    /// Write the match log to the output file.
    pub fn save_matches(&mut self) -> bool {
        if self.controller.log().is_empty() {
            self.notify(FILE_NOT_SAVED, NOTICE_COLOUR, SAVE_TIMEOUT);
            return false;
        }
        let result = self.match_io.save(
            &self.output,
            self.controller.log(),
            &self.panel.features,
            self.panel.detector.as_ref(),
        );
        match result {
            Ok(()) => {
                println!(
                    "Saved {} matches to {}",
                    self.controller.log().len(),
                    self.output.display()
                );
                self.notify(FILE_SAVED, INFO_COLOUR, SAVE_TIMEOUT);
                true
            }
            Err(err) => {
                error!("Saving matches to {} failed: {err}", self.output.display());
                self.notify(format!("Save failed: {err}"), ERROR_COLOUR, ERROR_TIMEOUT);
                false
            }
        }
    }

    /// Keys shared by both windows. Returns whether the key was consumed.
    pub fn handle_shortcut(&mut self, key: KeyCode, modifiers: Modifiers) -> bool {
        match key {
            KeyCode::Enter | KeyCode::NumpadEnter => {
                self.commit_match();
                true
            }
            KeyCode::Backspace if modifiers.ctrl => {
                self.undo_last_match();
                true
            }
            KeyCode::KeyS if modifiers.ctrl => {
                self.save_matches();
                true
            }
            _ => false,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Session state shared between the two windows' systems.
#[derive(Resource, Clone)]
pub struct SharedSession(Arc<Mutex<SessionState>>);

impl SharedSession {
    pub fn new(state: SessionState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    /// Lock the session. A panic on another thread while holding the lock
    /// leaves the state usable, so poisoning is ignored.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Raised when either window is closed. Every loop checks it once per frame.
#[derive(Resource, Clone, Default, Debug)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
