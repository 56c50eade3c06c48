use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use super::features::{DetectorInfo, FeatureArena, KeyPoint};
use super::match_log::MatchLog;

#[derive(Debug, Error)]
pub enum MatchIoError {
    #[error("failed to write matches: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode matches: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parent directory {0} not found")]
    MissingParent(PathBuf),

    #[error("no matches to save")]
    EmptyLog,
}

/// Serialiser for the match log.
pub trait MatchIo {
    fn write(
        &self,
        out: &mut dyn Write,
        log: &MatchLog,
        arena: &FeatureArena,
        detector: Option<&DetectorInfo>,
    ) -> Result<(), MatchIoError>;

    /// Write the log to `path`. Refuses an empty log and a path whose
    /// parent directory does not exist.
    fn save(
        &self,
        path: &Path,
        log: &MatchLog,
        arena: &FeatureArena,
        detector: Option<&DetectorInfo>,
    ) -> Result<(), MatchIoError> {
        if log.is_empty() {
            return Err(MatchIoError::EmptyLog);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(MatchIoError::MissingParent(parent.to_path_buf()));
            }
        }
        let mut out = BufWriter::new(File::create(path)?);
        self.write(&mut out, log, arena, detector)?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct DetectorBlock<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<&'a BTreeMap<String, String>>,
}

#[derive(Serialize)]
struct PointBlock {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Serialize)]
struct DescriptorBlock<'a> {
    status: bool,
    #[serde(rename = "type")]
    mat_type: i32,
    typename: String,
    rows: u32,
    cols: u32,
    data: &'a [f64],
}

#[derive(Serialize)]
struct FeatureBlock<'a> {
    descriptor: DescriptorBlock<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    keypoint: Option<&'a KeyPoint>,
}

#[derive(Serialize)]
struct MatchBlock<'a> {
    match3d: PointBlock,
    #[serde(rename = "matches2D")]
    matches_2d: Vec<FeatureBlock<'a>>,
}

#[derive(Serialize)]
struct MatchDocument<'a> {
    detector: DetectorBlock<'a>,
    matches: Vec<MatchBlock<'a>>,
}

/// Pretty-printed JSON writer (2-space indent).
#[derive(Debug, Clone, Copy)]
pub struct JsonMatchIo {
    pub write_keypoints: bool,
}

impl Default for JsonMatchIo {
    fn default() -> Self {
        Self {
            write_keypoints: true,
        }
    }
}

impl MatchIo for JsonMatchIo {
    fn write(
        &self,
        out: &mut dyn Write,
        log: &MatchLog,
        arena: &FeatureArena,
        detector: Option<&DetectorInfo>,
    ) -> Result<(), MatchIoError> {
        let detector = match detector {
            Some(info) => DetectorBlock {
                name: &info.name,
                parameters: Some(&info.parameters),
            },
            None => DetectorBlock {
                name: "unknown",
                parameters: None,
            },
        };

        let matches = log
            .records()
            .iter()
            .map(|record| MatchBlock {
                match3d: PointBlock {
                    x: record.point_3d.x,
                    y: record.point_3d.y,
                    z: record.point_3d.z,
                },
                matches_2d: record
                    .features_2d
                    .iter()
                    .filter_map(|h| arena.get(*h))
                    .filter(|f| !f.descriptor.is_empty())
                    .map(|f| FeatureBlock {
                        descriptor: DescriptorBlock {
                            status: true,
                            mat_type: f.descriptor.mat_type,
                            typename: f.descriptor.type_name(),
                            rows: f.descriptor.rows,
                            cols: f.descriptor.cols,
                            data: &f.descriptor.data,
                        },
                        keypoint: self.write_keypoints.then_some(&f.keypoint),
                    })
                    .collect(),
            })
            .collect();

        let document = MatchDocument { detector, matches };
        serde_json::to_writer_pretty(&mut *out, &document)?;
        writeln!(out)?;
        Ok(())
    }
}
