//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides [`AppConfig::media_base_path`].
pub const MEDIA_BASE_PATH_ENV: &str = "MEDIA_BASE_PATH";

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the media tree; final renders live under `outputs/`.
    pub media_base_path: PathBuf,

    /// Directory where project, caption, and highlight records are stored.
    pub store_dir: PathBuf,

    /// URL prefix under which `outputs/` is served to clients.
    pub public_media_prefix: String,

    /// Render pipeline settings.
    pub render: RenderSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Encoder and output settings shared by every segment of a render.
///
/// All segments of one job are encoded with the same settings so that they
/// can be joined with stream copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Engine binary name or path.
    pub ffmpeg_binary: String,

    /// Output frame width in pixels.
    pub width: u32,

    /// Output frame height in pixels.
    pub height: u32,

    /// Video encoder.
    pub video_codec: String,

    /// Constant-quality factor.
    pub crf: u8,

    /// Encoder speed preset.
    pub preset: String,

    /// Audio encoder.
    pub audio_codec: String,

    /// Parent directory for job-private temp dirs. `None` places them next
    /// to the final output.
    pub temp_root: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelcut=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            media_base_path: PathBuf::from("./media"),
            store_dir: dirs_default_store(),
            public_media_prefix: "/media/outputs".to_string(),
            render: RenderSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ffmpeg_binary: "ffmpeg".to_string(),
            width: 1080,
            height: 1920,
            video_codec: "libx264".to_string(),
            crf: 23,
            preset: "fast".to_string(),
            audio_codec: "aac".to_string(),
            temp_root: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    ///
    /// `MEDIA_BASE_PATH` takes precedence over the file either way.
    pub fn load() -> Self {
        let mut config = Self::load_from(&config_file_path());
        if let Ok(media) = std::env::var(MEDIA_BASE_PATH_ENV) {
            if !media.trim().is_empty() {
                config.media_base_path = PathBuf::from(media);
            }
        }
        config
    }

    /// Load config from an explicit file, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit file.
    pub fn save_to(&self, config_path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }

    /// Directory holding every rendered output.
    pub fn outputs_dir(&self) -> PathBuf {
        self.media_base_path.join("outputs")
    }

    /// Deterministic final output path for a project.
    pub fn output_path_for(&self, project_id: u64) -> PathBuf {
        self.outputs_dir()
            .join(project_id.to_string())
            .join("final.mp4")
    }

    /// Public URL of a project's final output.
    pub fn output_url_for(&self, project_id: u64) -> String {
        format!(
            "{}/{project_id}/final.mp4",
            self.public_media_prefix.trim_end_matches('/')
        )
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelcut").join("config.json")
}

/// Default record store directory.
fn dirs_default_store() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("reelcut").join("projects")
}
