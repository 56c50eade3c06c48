use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bevy::prelude::*;

use super::error::{ColourWarning, LoadError};
use super::las_loader::{announced_points, create_reader, las_points};
use super::ply_loader::{ColourLayout, PlyVertexReader};
use super::progress::{PROGRESS_STEP, point_progress_bar};
use crate::engine::assets::bounds::{BoundingStats, BoundsAccumulator, CentreMode};
use crate::engine::assets::point_cloud::{PointCloud, PointTransform};
use crate::engine::spatial_index::{IndexError, SpatialIndex};
use constants::render_settings::DEFAULT_POINT_COLOUR;

/// Everything produced by one load: the cloud, its statistics and the
/// spatial index built over it.
#[derive(Debug)]
pub struct LoadedCloud {
    pub cloud: PointCloud,
    pub stats: BoundingStats,
    /// Index build failure leaves the cloud viewable but unpickable.
    pub index: Result<SpatialIndex, IndexError>,
    pub colour_warning: Option<ColourWarning>,
}

impl LoadedCloud {
    /// Statistics and index for a cloud built in memory. `None` when the
    /// cloud is empty.
    pub fn from_cloud(cloud: PointCloud, centre_mode: CentreMode) -> Option<Self> {
        let mut bounds = BoundsAccumulator::new(centre_mode, cloud.len());
        for &p in cloud.positions() {
            bounds.update(p);
        }
        let stats = bounds.finish()?;
        let index = SpatialIndex::build(cloud.positions());
        Some(Self {
            cloud,
            stats,
            index,
            colour_warning: None,
        })
    }
}

/// Reads PLY and LAS/LAZ files into a [`PointCloud`], applying scale and
/// Y/Z flip as each point is read and tracking bounds in the same pass.
#[derive(Debug, Clone, Copy)]
pub struct PointCloudLoader {
    pub transform: PointTransform,
    pub centre_mode: CentreMode,
    pub show_progress: bool,
}

impl Default for PointCloudLoader {
    fn default() -> Self {
        Self {
            transform: PointTransform::default(),
            centre_mode: CentreMode::Median,
            show_progress: false,
        }
    }
}

impl PointCloudLoader {
    pub fn new(transform: PointTransform, centre_mode: CentreMode) -> Self {
        Self {
            transform,
            centre_mode,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Load a point cloud file, choosing the reader from the extension.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedCloud, LoadError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(LoadError::FileNotFound(path.to_path_buf()));
        }
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let start = Instant::now();
        let loaded = match extension.as_str() {
            "ply" => {
                let mut reader = BufReader::new(File::open(path)?);
                self.load_ply(&mut reader, path)?
            }
            "las" | "laz" => self.load_las(path)?,
            _ => return Err(LoadError::UnsupportedFormat(extension)),
        };

        info!(
            "Loaded {} points from {} in {:.2}s (centre {:?}, max_r {:.3})",
            loaded.cloud.len(),
            path.display(),
            start.elapsed().as_secs_f32(),
            loaded.stats.centre,
            loaded.stats.max_r()
        );
        if let Some(warning) = &loaded.colour_warning {
            warn!("Could not read colours from {}: {}", path.display(), warning);
        }
        if let Err(err) = &loaded.index {
            warn!("Spatial index unavailable, picking disabled: {}", err);
        }
        Ok(loaded)
    }

    /// Load PLY data from any buffered reader. `source` names the data in errors.
    pub fn load_ply<R: BufRead>(&self, reader: &mut R, source: &Path) -> Result<LoadedCloud, LoadError> {
        let vertices = PlyVertexReader::new(reader)?;
        let total = vertices.count;
        if total == 0 {
            return Err(LoadError::EmptyPointSet(source.to_path_buf()));
        }

        let layout = vertices.layout;
        let warning = vertices.warning.clone();
        let coloured = layout != ColourLayout::None;
        let mut cloud = PointCloud::with_capacity(self.transform, total, coloured);
        let mut bounds = BoundsAccumulator::new(self.centre_mode, total);
        let pb = point_progress_bar(total as u64, self.show_progress);

        let read = vertices.for_each_vertex(|i, vertex| {
            let point = vertex.point().ok_or_else(|| {
                LoadError::Parse(format!("vertex {i} has a non-numeric coordinate"))
            })?;
            let colour = vertex.colour(layout);
            let position = cloud.push(point, colour.or(coloured.then_some(DEFAULT_POINT_COLOUR)));
            bounds.update(position);
            if i % PROGRESS_STEP == 0 {
                pb.set_position(i as u64);
            }
            Ok(())
        });
        if let Err(err) = read {
            pb.abandon();
            return Err(err);
        }
        pb.finish_with_message("loaded");

        self.finish(cloud, bounds, warning, source)
    }

    fn load_las(&self, path: &Path) -> Result<LoadedCloud, LoadError> {
        let mut reader = create_reader(path)?;
        let total = announced_points(&reader);
        let mut cloud = PointCloud::with_capacity(self.transform, total as usize, true);
        let mut bounds = BoundsAccumulator::new(self.centre_mode, total as usize);
        let pb = point_progress_bar(total, self.show_progress);

        for (i, point_result) in las_points(&mut reader).enumerate() {
            let point = point_result?;
            let position = cloud.push(point.position, point.colour);
            bounds.update(position);
            if i % PROGRESS_STEP == 0 {
                pb.set_position(i as u64);
            }
        }
        pb.finish_with_message("loaded");

        self.finish(cloud, bounds, None, path)
    }

    fn finish(
        &self,
        mut cloud: PointCloud,
        bounds: BoundsAccumulator,
        colour_warning: Option<ColourWarning>,
        source: &Path,
    ) -> Result<LoadedCloud, LoadError> {
        cloud.settle_colours();
        let stats = bounds
            .finish()
            .ok_or_else(|| LoadError::EmptyPointSet(PathBuf::from(source)))?;
        let index = SpatialIndex::build(cloud.positions());
        Ok(LoadedCloud {
            cloud,
            stats,
            index,
            colour_warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    const CORNERS: &str = "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n1 0 0\n0 1 0\n0 0 1\n";

    fn load_str(loader: &PointCloudLoader, text: &str) -> Result<LoadedCloud, LoadError> {
        loader.load_ply(&mut Cursor::new(text.as_bytes()), Path::new("memory.ply"))
    }

    #[test]
    fn corner_cloud_with_mean_centre() {
        let loader = PointCloudLoader::new(PointTransform::default(), CentreMode::Mean);
        let loaded = load_str(&loader, CORNERS).expect("load");
        assert_eq!(loaded.cloud.len(), 4);
        assert_relative_eq!(loaded.stats.centre.x, 0.25, max_relative = 1e-5);
        assert_relative_eq!(loaded.stats.centre.y, 0.25, max_relative = 1e-5);
        assert_relative_eq!(loaded.stats.centre.z, 0.25, max_relative = 1e-5);
        assert_relative_eq!(loaded.stats.max_r(), 3f32.sqrt(), max_relative = 1e-6);
        assert!(loaded.index.is_ok());
        assert!(!loaded.cloud.has_colours());
    }

    #[test]
    fn scale_and_flip_are_applied_at_read_time() {
        let loader = PointCloudLoader::new(PointTransform::new(2.5, true), CentreMode::Median);
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nend_header\n1 2 3\n";
        let loaded = load_str(&loader, text).expect("load");
        assert_eq!(loaded.cloud.position(0), Some(Vec3::new(2.5, -5.0, -7.5)));
        assert_eq!(loaded.cloud.original(0), Some(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn records_after_the_vertices_are_never_read() {
        let loader = PointCloudLoader::new(PointTransform::new(2.0, true), CentreMode::Mean);
        let text = "ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nelement face 1\nproperty list uchar int vertex_indices\nend_header\n1 1 1\n3 1 1\nnot a face\n";
        let loaded = load_str(&loader, text).expect("load");
        assert_eq!(loaded.cloud.position(1), Some(Vec3::new(6.0, -2.0, -2.0)));
        assert_relative_eq!(loaded.stats.centre.x, 4.0, max_relative = 1e-6);
        assert_relative_eq!(loaded.stats.centre.y, -2.0, max_relative = 1e-6);
    }

    #[test]
    fn truncated_vertex_payload_is_a_parse_error() {
        let loader = PointCloudLoader::default();
        let text = "ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n1 1 1\n";
        assert!(matches!(load_str(&loader, text), Err(LoadError::Parse(_))));
    }

    #[test]
    fn empty_vertex_element_is_rejected() {
        let loader = PointCloudLoader::default();
        let text = "ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nproperty float y\nproperty float z\nend_header\n";
        assert!(matches!(load_str(&loader, text), Err(LoadError::EmptyPointSet(_))));
    }

    #[test]
    fn missing_file_and_unknown_extension() {
        let loader = PointCloudLoader::default();
        assert!(matches!(
            loader.load("/definitely/not/here.ply"),
            Err(LoadError::FileNotFound(_))
        ));
        let path = std::env::temp_dir().join(format!("pnp-trainer-{}.xyz", std::process::id()));
        std::fs::write(&path, "0 0 0\n").expect("write fixture");
        let result = loader.load(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(LoadError::UnsupportedFormat(ext)) if ext == "xyz"));
    }
}
