//! CLI subcommands.

use std::sync::Arc;

use reelcut_common::config::AppConfig;
use reelcut_project_model::JsonStore;
use reelcut_render_engine::{FfmpegEngine, RenderJobController};

pub mod check;
pub mod import;
pub mod info;
pub mod init;
pub mod output;
pub mod progress;
pub mod render;

/// Open the record store named by the config.
pub fn open_store(config: &AppConfig) -> anyhow::Result<JsonStore> {
    JsonStore::open(&config.store_dir).map_err(|e| {
        anyhow::anyhow!(
            "Failed to open project store at {}: {e}",
            config.store_dir.display()
        )
    })
}

/// Controller over the configured store and the ffmpeg engine.
pub fn controller(config: AppConfig) -> anyhow::Result<RenderJobController> {
    let store = Arc::new(open_store(&config)?);
    let engine = Arc::new(FfmpegEngine::new(config.render.clone()));
    Ok(RenderJobController::new(store, engine, config))
}
