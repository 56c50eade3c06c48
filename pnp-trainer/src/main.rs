use std::error::Error;

use bevy::app::AppExit;
use clap::Parser;
use pnp_trainer::cli::{Args, KeypointSource, TrainerConfig};
use pnp_trainer::engine::core::app_setup::create_app;
use pnp_trainer::engine::core::session::{SessionState, SharedSession};
use pnp_trainer::engine::loading::image_loader::load_image;
use pnp_trainer::engine::loading::point_cloud_loader::PointCloudLoader;
use pnp_trainer::tools::features::{FeatureArena, FeatureFile, FeatureLoadError};
use pnp_trainer::tools::matcher::MatchPanel;

/// Keypoints for the image. A missing default file leaves the image without
/// any; a missing explicit file is an error.
fn load_keypoints(source: &KeypointSource) -> Result<FeatureFile, FeatureLoadError> {
    match (source, FeatureFile::load(source.path())) {
        (KeypointSource::Default(path), Err(FeatureLoadError::FileNotFound(_))) => {
            println!("No keypoint file at {}, image has no features", path.display());
            Ok(FeatureFile::default())
        }
        (_, result) => result,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let config = TrainerConfig::try_from(Args::parse())?;

    println!("=== PNP TRAINER ===");
    println!("  Image: {}", config.image.display());
    println!("  Cloud: {}", config.cloud.display());
    println!("  Output: {}", config.output.display());

    let image = load_image(&config.image)?;

    let loaded = PointCloudLoader::new(config.transform, config.centre_mode)
        .with_progress(config.show_progress)
        .load(&config.cloud)?;
    println!(
        "Loaded {} points (centre {:?}, max_r {:.3})",
        loaded.cloud.len(),
        loaded.stats.centre,
        loaded.stats.max_r()
    );
    if let Some(warning) = &loaded.colour_warning {
        println!("Warning: could not read colours, using default: {warning}");
    }
    if let Err(err) = &loaded.index {
        println!("Warning: picking disabled: {err}");
    }

    let keypoints = load_keypoints(&config.keypoints)?;
    println!("Loaded {} keypoints", keypoints.features.len());

    let panel = MatchPanel::new(
        FeatureArena::new(keypoints.features),
        keypoints.detector,
        config.transform,
    );
    let session = SharedSession::new(SessionState::new(loaded, panel, config.output.clone()));

    let exit = create_app(&config, session.clone(), image).run();

    let recorded = session.lock().controller.log().len();
    println!("Session closed with {recorded} recorded matches");

    match exit {
        AppExit::Success => Ok(()),
        AppExit::Error(code) => Err(format!("app exited with code {code}").into()),
    }
}
