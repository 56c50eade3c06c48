//! Command line arguments and their validated form.

use std::path::{Path, PathBuf};

use clap::Parser;
use constants::render_settings::DEFAULT_VIEWER_POINT_SIZE;
use constants::selection::{DEFAULT_CLICK_RADIUS, DEFAULT_MATCH_FILE, MIN_CLICK_RADIUS};
use thiserror::Error;

use crate::engine::assets::bounds::CentreMode;
use crate::engine::assets::point_cloud::PointTransform;
use crate::engine::loading::image_loader::image_extension;

/// Suffix of the keypoint file looked up next to the image by default.
pub const KEYPOINT_SUFFIX: &str = "features.json";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "pnp-trainer",
    version,
    about = "Match 2D image keypoints to points of a 3D point cloud"
)]
pub struct Args {
    /// Image the keypoints were detected in (png, jpg or jpeg)
    pub image: PathBuf,

    /// Point cloud file (ply, las or laz)
    pub cloud: PathBuf,

    /// Scale applied to every point as it is read
    #[arg(short = 'S', long, default_value_t = 1.0)]
    pub scale: f32,

    /// Point size in pixels, negative for the default
    #[arg(short = 'P', long = "point-size", default_value_t = -1.0, allow_negative_numbers = true)]
    pub point_size: f32,

    /// Negate Y and Z of every point
    #[arg(short = 'f', long)]
    pub flip: bool,

    /// Radius in pixels of a right-click feature selection
    #[arg(short = 'r', long = "click-radius", default_value_t = DEFAULT_CLICK_RADIUS)]
    pub click_radius: f32,

    /// Select only the strongest feature inside the click radius
    #[arg(short = 'b', long)]
    pub best: bool,

    /// Centre the view on the mean instead of the median point
    #[arg(long = "mean-centre")]
    pub mean_centre: bool,

    /// Keypoint file (default: <image stem>.features.json next to the image)
    #[arg(short = 'k', long)]
    pub keypoints: Option<PathBuf>,

    /// Output file for saved matches
    #[arg(short = 'o', long, default_value = DEFAULT_MATCH_FILE)]
    pub output: PathBuf,

    /// Hide the terminal progress bar while loading
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("scale must be positive, got {0}")]
    NonPositiveScale(f32),

    #[error("point size must not be 0")]
    ZeroPointSize,

    #[error("click radius must be at least 1, got {0}")]
    ClickRadiusTooSmall(f32),

    #[error("{0} is not a png or jpeg image")]
    UnsupportedImage(PathBuf),

    #[error("{0} is not a ply, las or laz point cloud")]
    UnsupportedCloud(PathBuf),

    #[error("{0} does not exist")]
    MissingFile(PathBuf),
}

/// Where the keypoints come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypointSource {
    /// Given on the command line; a missing file is an error.
    Explicit(PathBuf),
    /// Derived from the image name; a missing file leaves the image without
    /// features.
    Default(PathBuf),
}

impl KeypointSource {
    pub fn path(&self) -> &Path {
        match self {
            KeypointSource::Explicit(p) | KeypointSource::Default(p) => p,
        }
    }
}

/// Validated startup configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    pub image: PathBuf,
    pub cloud: PathBuf,
    pub transform: PointTransform,
    pub centre_mode: CentreMode,
    pub point_size: Option<f32>,
    pub click_radius: f32,
    pub best_only: bool,
    pub keypoints: KeypointSource,
    pub output: PathBuf,
    pub show_progress: bool,
}

impl TrainerConfig {
    /// Point size of the point cloud window.
    pub fn viewer_point_size(&self) -> f32 {
        self.point_size.unwrap_or(DEFAULT_VIEWER_POINT_SIZE)
    }
}

/// `<dir>/<stem>.features.json` for an image at `<dir>/<stem>.<ext>`.
pub fn default_keypoint_path(image: &Path) -> PathBuf {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    image.with_file_name(format!("{stem}.{KEYPOINT_SUFFIX}"))
}

fn is_cloud_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "ply" | "las" | "laz"))
}

impl TryFrom<Args> for TrainerConfig {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        if !(args.scale > 0.0) {
            return Err(ConfigError::NonPositiveScale(args.scale));
        }
        if args.point_size == 0.0 {
            return Err(ConfigError::ZeroPointSize);
        }
        if !(args.click_radius >= MIN_CLICK_RADIUS) {
            return Err(ConfigError::ClickRadiusTooSmall(args.click_radius));
        }
        if image_extension(&args.image).is_none() {
            return Err(ConfigError::UnsupportedImage(args.image));
        }
        if !is_cloud_file(&args.cloud) {
            return Err(ConfigError::UnsupportedCloud(args.cloud));
        }
        for path in [&args.image, &args.cloud] {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.clone()));
            }
        }

        let keypoints = match args.keypoints {
            Some(path) => KeypointSource::Explicit(path),
            None => KeypointSource::Default(default_keypoint_path(&args.image)),
        };
        let centre_mode = if args.mean_centre {
            CentreMode::Mean
        } else {
            CentreMode::Median
        };

        Ok(Self {
            transform: PointTransform::new(args.scale, args.flip),
            centre_mode,
            point_size: (args.point_size > 0.0).then_some(args.point_size),
            click_radius: args.click_radius,
            best_only: args.best,
            keypoints,
            output: args.output,
            show_progress: !args.quiet,
            image: args.image,
            cloud: args.cloud,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Fixture {
        image: PathBuf,
        cloud: PathBuf,
    }

    impl Fixture {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir();
            let image = dir.join(format!("pnp_cli_{}_{}.png", name, std::process::id()));
            let cloud = dir.join(format!("pnp_cli_{}_{}.ply", name, std::process::id()));
            fs::write(&image, b"").unwrap();
            fs::write(&cloud, b"").unwrap();
            Self { image, cloud }
        }

        fn parse(&self, extra: &[&str]) -> Result<TrainerConfig, ConfigError> {
            let mut argv = vec![
                "pnp-trainer".to_string(),
                self.image.display().to_string(),
                self.cloud.display().to_string(),
            ];
            argv.extend(extra.iter().map(|s| s.to_string()));
            TrainerConfig::try_from(Args::try_parse_from(argv).unwrap())
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            fs::remove_file(&self.image).ok();
            fs::remove_file(&self.cloud).ok();
        }
    }

    #[test]
    fn defaults() {
        let fixture = Fixture::new("defaults");
        let config = fixture.parse(&[]).unwrap();
        assert_eq!(config.transform, PointTransform::default());
        assert_eq!(config.centre_mode, CentreMode::Median);
        assert_eq!(config.point_size, None);
        assert_eq!(config.viewer_point_size(), DEFAULT_VIEWER_POINT_SIZE);
        assert_eq!(config.click_radius, DEFAULT_CLICK_RADIUS);
        assert_eq!(config.output, PathBuf::from(DEFAULT_MATCH_FILE));
        assert_eq!(
            config.keypoints,
            KeypointSource::Default(default_keypoint_path(&fixture.image))
        );
    }

    #[test]
    fn flags_are_applied() {
        let fixture = Fixture::new("flags");
        let config = fixture
            .parse(&["-S", "0.5", "-f", "-P", "4", "-r", "8", "-b", "--mean-centre", "-k", "kp.json"])
            .unwrap();
        assert_eq!(config.transform, PointTransform::new(0.5, true));
        assert_eq!(config.viewer_point_size(), 4.0);
        assert_eq!(config.click_radius, 8.0);
        assert!(config.best_only);
        assert_eq!(config.centre_mode, CentreMode::Mean);
        assert_eq!(config.keypoints, KeypointSource::Explicit(PathBuf::from("kp.json")));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let fixture = Fixture::new("invalid");
        assert_eq!(fixture.parse(&["-S", "0"]), Err(ConfigError::NonPositiveScale(0.0)));
        assert_eq!(fixture.parse(&["-P", "0"]), Err(ConfigError::ZeroPointSize));
        assert_eq!(
            fixture.parse(&["-r", "0.5"]),
            Err(ConfigError::ClickRadiusTooSmall(0.5))
        );
    }

    #[test]
    fn wrong_extensions_and_missing_files() {
        let args = Args::try_parse_from(["pnp-trainer", "image.bmp", "cloud.ply"]).unwrap();
        assert!(matches!(
            TrainerConfig::try_from(args),
            Err(ConfigError::UnsupportedImage(_))
        ));
        let args = Args::try_parse_from(["pnp-trainer", "image.png", "cloud.xyz"]).unwrap();
        assert!(matches!(
            TrainerConfig::try_from(args),
            Err(ConfigError::UnsupportedCloud(_))
        ));
        let args = Args::try_parse_from(["pnp-trainer", "/no/such/image.png", "cloud.ply"]).unwrap();
        assert!(matches!(TrainerConfig::try_from(args), Err(ConfigError::MissingFile(_))));
    }

    #[test]
    fn keypoint_path_sits_next_to_the_image() {
        assert_eq!(
            default_keypoint_path(Path::new("/data/shot_01.jpg")),
            PathBuf::from("/data/shot_01.features.json")
        );
    }
}
