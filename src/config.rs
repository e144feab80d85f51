//! # Configuration Module
//!
//! Start-up configuration for the daemon.
//!
//! ## Configuration Storage
//! Stored as JSON in:
//! `~/.config/ambient-clock/config.json`
//!
//! The file only seeds the daemon at start-up. Alarms and the wallpaper
//! selection changed at run time are kept in memory and are not written back.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::wallpaper::DEFAULT_INTERVAL_SECS;

const APP_DIR: &str = "ambient-clock";

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Packed asset bundle consulted first for wallpapers.
    /// Defaults to `~/.local/share/ambient-clock/assets.bin`
    pub asset_bundle: String,
    /// Directory searched for wallpapers missing from the bundle.
    /// Defaults to `~/.local/share/ambient-clock/storage/`
    pub storage_dir: String,
    /// Directory holding `ga.ogg`, `alarm1.ogg` and `iphone.ogg`
    pub sounds_dir: String,
    /// Command used to play a ringtone file (the path is appended)
    pub player_command: String,
    /// Wallpapers applied at start-up, in rotation order
    pub wallpapers: Vec<String>,
    pub auto_rotate: bool,
    pub rotate_interval_secs: u32,
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

impl Default for Config {
    fn default() -> Self {
        let data = data_dir();
        Self {
            asset_bundle: data.join("assets.bin").to_string_lossy().to_string(),
            storage_dir: data.join("storage").to_string_lossy().to_string(),
            sounds_dir: data.join("sounds").to_string_lossy().to_string(),
            player_command: "paplay".to_string(),
            wallpapers: Vec::new(),
            auto_rotate: true,
            rotate_interval_secs: DEFAULT_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Returns the path to the configuration file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.json"))
    }

    /// Loads the configuration from disk.
    ///
    /// A missing or unparsable file gives the defaults.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|content| Self::from_json(&content))
            .unwrap_or_default()
    }

    fn from_json(content: &str) -> Option<Self> {
        match serde_json::from_str(content) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("Ignoring invalid config file: {e}");
                None
            }
        }
    }

    /// Writes the configuration as pretty-printed JSON, creating the directory if needed.
    pub fn save(&self) -> Result<PathBuf, String> {
        let path = Self::config_path().ok_or("Could not determine config path")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;

        Ok(path)
    }
}
