use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use bevy::prelude::*;
use las::Reader;

use super::error::LoadError;

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
pub(crate) fn create_reader(file_path: &Path) -> Result<Reader, LoadError> {
    let file = File::open(file_path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

/// One LAS point reduced to what the trainer needs.
pub(crate) struct LasPoint {
    pub position: Vec3,
    pub colour: Option<[f32; 4]>,
}

/// Number of points announced by the LAS header.
pub(crate) fn announced_points(reader: &Reader) -> u64 {
    reader.header().number_of_points()
}

/// Iterate the points of an open reader. 16-bit colours are normalised.
pub(crate) fn las_points(reader: &mut Reader) -> impl Iterator<Item = Result<LasPoint, LoadError>> + '_ {
    reader.points().map(|point_result| {
        let point = point_result?;
        let colour = point.color.map(|c| {
            [
                c.red as f32 / 65535.0,
                c.green as f32 / 65535.0,
                c.blue as f32 / 65535.0,
                1.0,
            ]
        });
        Ok(LasPoint {
            position: Vec3::new(point.x as f32, point.y as f32, point.z as f32),
            colour,
        })
    })
}
