use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single point cloud load. The viewer keeps whatever state it
/// had before the load was attempted.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("point cloud file {0} not found")]
    FileNotFound(PathBuf),

    #[error("error reading point cloud: {0}")]
    Io(#[from] io::Error),

    #[error("could not parse point cloud: {0}")]
    Parse(String),

    #[error("no vertices in file {0}")]
    EmptyPointSet(PathBuf),

    #[error("unsupported point cloud format '{0}' (expected ply, las or laz)")]
    UnsupportedFormat(String),
}

impl From<las::Error> for LoadError {
    fn from(err: las::Error) -> Self {
        LoadError::Parse(err.to_string())
    }
}

/// Recoverable colour problem found while loading. The cloud is still
/// returned, rendered with the default colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColourWarning {
    /// Some colour properties exist but not all of red, green and blue.
    Incomplete { present: Vec<String> },
    /// A colour property has a type other than an unsigned byte.
    Unreadable { property: String },
}

impl std::fmt::Display for ColourWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColourWarning::Incomplete { present } => {
                write!(f, "incomplete colour channels ({})", present.join(", "))
            }
            ColourWarning::Unreadable { property } => {
                write!(f, "colour property '{property}' is not an unsigned byte")
            }
        }
    }
}

/// Failure to read the image shown in the match window. Fatal at startup.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("image file {0} not found")]
    FileNotFound(PathBuf),

    #[error("error reading image: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported image format '{0}' (expected png, jpg or jpeg)")]
    UnsupportedFormat(String),

    #[error("could not decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
}
