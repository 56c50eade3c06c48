pub mod assets;
pub mod camera;
pub mod core;
pub mod loading;
pub mod render;
pub mod spatial_index;
pub mod status;
