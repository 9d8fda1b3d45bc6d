pub mod canvas;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod geometry;
pub mod issues;
pub mod log;
pub mod model;
pub mod render;
pub mod scene_dump;
pub mod store;
pub mod theme;

pub use canvas::changeset::{ChangeSet, MergeReport, apply_change_set, parse_change_set};
pub use canvas::error::CanvasError;
pub use canvas::{Scene, compute_document_scene, compute_scene};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{CanvasConfig, Config, load_config, parse_config};
pub use model::{Canvas, Document};
