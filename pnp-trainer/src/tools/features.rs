//! 2D image features shown in the match window.
//!
//! Keypoints and descriptors come from an external detector run and are read
//! from a JSON file. Every feature lives in one [`FeatureArena`] and is
//! referred to everywhere else by a [`FeatureHandle`], including from
//! recorded matches.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeatureLoadError {
    #[error("keypoint file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read keypoint file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid keypoint file: {0}")]
    Json(#[from] serde_json::Error),
}

fn default_angle() -> f32 {
    -1.0
}

fn default_class_id() -> i32 {
    -1
}

/// Detected keypoint in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub size: f32,
    #[serde(default = "default_angle")]
    pub angle: f32,
    #[serde(default)]
    pub response: f32,
    #[serde(default)]
    pub octave: i32,
    #[serde(default = "default_class_id")]
    pub class_id: i32,
}

impl KeyPoint {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            size: 0.0,
            angle: default_angle(),
            response: 0.0,
            octave: 0,
            class_id: default_class_id(),
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Descriptor matrix in row-major order. `mat_type` is the detector's
/// element type code (depth in the low three bits, channels above).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(rename = "type", default)]
    pub mat_type: i32,
    #[serde(default)]
    pub rows: u32,
    #[serde(default)]
    pub cols: u32,
    #[serde(default)]
    pub data: Vec<f64>,
}

impl Descriptor {
    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0 || self.data.is_empty()
    }

    /// Human readable element type, e.g. `CV_8UC1`.
    pub fn type_name(&self) -> String {
        let depth = match self.mat_type & 7 {
            0 => "8U",
            1 => "8S",
            2 => "16U",
            3 => "16S",
            4 => "32S",
            5 => "32F",
            6 => "64F",
            _ => "16F",
        };
        let channels = (self.mat_type >> 3) + 1;
        format!("CV_{depth}C{channels}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub keypoint: KeyPoint,
    #[serde(default)]
    pub descriptor: Descriptor,
}

/// Name and settings of the detector that produced the features.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectorInfo {
    pub name: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// On-disk layout of a keypoint file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFile {
    #[serde(default)]
    pub detector: Option<DetectorInfo>,
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FeatureLoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FeatureLoadError::FileNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Stable index of a feature inside a [`FeatureArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureHandle(pub u32);

impl FeatureHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owner of every feature of the current image plus the current selection.
///
/// The selection keeps the order in which features were picked; `flags`
/// mirrors it for O(1) membership tests.
#[derive(Debug, Clone, Default)]
pub struct FeatureArena {
    features: Vec<Feature>,
    selected: Vec<FeatureHandle>,
    flags: Vec<bool>,
}

impl FeatureArena {
    pub fn new(features: Vec<Feature>) -> Self {
        let flags = vec![false; features.len()];
        Self {
            features,
            selected: Vec::new(),
            flags,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, handle: FeatureHandle) -> Option<&Feature> {
        self.features.get(handle.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureHandle, &Feature)> {
        self.features
            .iter()
            .enumerate()
            .map(|(i, f)| (FeatureHandle(i as u32), f))
    }

    pub fn selected(&self) -> &[FeatureHandle] {
        &self.selected
    }

    pub fn is_selected(&self, handle: FeatureHandle) -> bool {
        self.flags.get(handle.index()).copied().unwrap_or(false)
    }

    pub fn clear_selection(&mut self) {
        for handle in self.selected.drain(..) {
            self.flags[handle.index()] = false;
        }
    }

    /// Replace the selection, e.g. with the features of an earlier match.
    /// Unknown handles are ignored.
    pub fn set_selection(&mut self, handles: &[FeatureHandle]) {
        self.clear_selection();
        for &handle in handles {
            self.select(handle);
        }
    }

    fn select(&mut self, handle: FeatureHandle) -> bool {
        match self.flags.get_mut(handle.index()) {
            Some(flag) if !*flag => {
                *flag = true;
                self.selected.push(handle);
                true
            }
            _ => false,
        }
    }

    fn deselect(&mut self, handle: FeatureHandle) -> bool {
        match self.flags.get_mut(handle.index()) {
            Some(flag) if *flag => {
                *flag = false;
                self.selected.retain(|h| *h != handle);
                true
            }
            _ => false,
        }
    }

    fn apply(&mut self, hits: Vec<FeatureHandle>, deselect: bool) -> bool {
        let mut changed = false;
        for handle in hits {
            changed |= if deselect {
                self.deselect(handle)
            } else {
                self.select(handle)
            };
        }
        changed
    }

    /// Select (or with `deselect` unselect) every feature within `radius`
    /// pixels of `at`. In `best_only` mode only the strongest response among
    /// them is selected. Returns whether the selection changed.
    pub fn click(&mut self, at: Vec2, radius: f32, deselect: bool, best_only: bool) -> bool {
        let radius_sq = radius * radius;
        let mut hits: Vec<FeatureHandle> = self
            .iter()
            .filter(|(_, f)| f.keypoint.position().distance_squared(at) <= radius_sq)
            .map(|(h, _)| h)
            .collect();
        if hits.is_empty() {
            return false;
        }
        if best_only && !deselect {
            let best = hits.iter().copied().max_by(|a, b| {
                let ra = self.features[a.index()].keypoint.response;
                let rb = self.features[b.index()].keypoint.response;
                ra.total_cmp(&rb).then(b.cmp(a))
            });
            hits = best.into_iter().collect();
        }
        self.apply(hits, deselect)
    }

    /// Rectangle selection in image pixels. `min` is inclusive and `max`
    /// exclusive, so adjacent rectangles never share a keypoint.
    pub fn select_rect(&mut self, min: Vec2, max: Vec2, deselect: bool) -> bool {
        let hits: Vec<FeatureHandle> = self
            .iter()
            .filter(|(_, f)| {
                let p = f.keypoint.position();
                p.x >= min.x && p.x < max.x && p.y >= min.y && p.y < max.y
            })
            .map(|(h, _)| h)
            .collect();
        self.apply(hits, deselect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> FeatureArena {
        let mut a = KeyPoint::at(10.0, 10.0);
        a.response = 0.2;
        let mut b = KeyPoint::at(12.0, 11.0);
        b.response = 0.9;
        let c = KeyPoint::at(100.0, 40.0);
        FeatureArena::new(
            [a, b, c]
                .into_iter()
                .map(|keypoint| Feature {
                    keypoint,
                    descriptor: Descriptor::default(),
                })
                .collect(),
        )
    }

    #[test]
    fn click_selects_everything_in_radius() {
        let mut features = arena();
        assert!(features.click(Vec2::new(11.0, 10.0), 5.0, false, false));
        assert_eq!(features.selected(), &[FeatureHandle(0), FeatureHandle(1)]);
        assert!(!features.click(Vec2::new(11.0, 10.0), 5.0, false, false));
    }

    #[test]
    fn best_only_keeps_strongest_response() {
        let mut features = arena();
        features.click(Vec2::new(11.0, 10.0), 5.0, false, true);
        assert_eq!(features.selected(), &[FeatureHandle(1)]);
    }

    #[test]
    fn ctrl_click_deselects() {
        let mut features = arena();
        features.click(Vec2::new(11.0, 10.0), 5.0, false, false);
        assert!(features.click(Vec2::new(10.0, 10.0), 1.0, true, false));
        assert_eq!(features.selected(), &[FeatureHandle(1)]);
        assert!(!features.is_selected(FeatureHandle(0)));
    }

    #[test]
    fn rectangle_is_half_open() {
        let mut features = arena();
        assert!(features.select_rect(Vec2::new(0.0, 0.0), Vec2::new(12.0, 50.0), false));
        assert_eq!(features.selected(), &[FeatureHandle(0)]);
        features.select_rect(Vec2::new(0.0, 0.0), Vec2::new(200.0, 50.0), false);
        assert_eq!(features.selected().len(), 3);
    }

    #[test]
    fn set_selection_ignores_unknown_handles() {
        let mut features = arena();
        features.set_selection(&[FeatureHandle(2), FeatureHandle(9)]);
        assert_eq!(features.selected(), &[FeatureHandle(2)]);
    }

    #[test]
    fn feature_file_defaults() {
        let json = r#"{"features":[{"keypoint":{"x":1.5,"y":2.0,"response":0.3}}]}"#;
        let file: FeatureFile = serde_json::from_str(json).expect("parse");
        assert!(file.detector.is_none());
        let kp = file.features[0].keypoint;
        assert_eq!(kp.angle, -1.0);
        assert_eq!(kp.class_id, -1);
        assert!(file.features[0].descriptor.is_empty());
    }

    #[test]
    fn descriptor_type_names() {
        let d = Descriptor {
            mat_type: 5,
            ..Default::default()
        };
        assert_eq!(d.type_name(), "CV_32FC1");
        let d = Descriptor {
            mat_type: 0,
            ..Default::default()
        };
        assert_eq!(d.type_name(), "CV_8UC1");
    }
}
