use std::fs;
use std::path::Path;

use bevy::image::{CompressedImageFormats, ImageSampler, ImageType};
use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;

use super::error::ImageLoadError;

/// Extensions accepted for the match window image.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Lower-cased extension of `path` if it names a supported image.
pub fn image_extension(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

/// Decode the image synchronously so a bad file is reported before any
/// window opens.
pub fn load_image(path: impl AsRef<Path>) -> Result<Image, ImageLoadError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ImageLoadError::FileNotFound(path.to_path_buf()));
    }
    let Some(extension) = image_extension(path) else {
        let found = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        return Err(ImageLoadError::UnsupportedFormat(found));
    };

    let bytes = fs::read(path)?;
    let image = Image::from_buffer(
        &bytes,
        ImageType::Extension(&extension),
        CompressedImageFormats::NONE,
        true,
        ImageSampler::nearest(),
        RenderAssetUsages::default(),
    )
    .map_err(|err| ImageLoadError::Decode {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    info!(
        "Loaded image {} ({}x{})",
        path.display(),
        image.width(),
        image.height()
    );
    Ok(image)
}
