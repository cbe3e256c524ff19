//! Configuration management (`<config dir>/config.toml`)
//!
//! Handles loading, saving, and providing defaults for synchronization
//! settings. Settings are stored in TOML format in the platform-specific
//! config directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::ProcessedCountMode;
use crate::error::{Result, SyncError};

/// Synchronization configuration.
///
/// Serialized to/from TOML. Every field has a default, so partial files are
/// valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Target sample rate handed to the analysis engine (default: 48000)
    #[serde(default = "default_samples_per_sec")]
    pub samples_per_sec: u32,
    /// Delay before mouth parameters are zeroed after a segment ends (default: 100)
    #[serde(default = "default_mouth_reset_delay_ms")]
    pub mouth_reset_delay_ms: u64,
    /// Cap on samples waiting for analysis; older samples are dropped (default: 96000)
    #[serde(default = "default_max_pending_samples")]
    pub max_pending_samples: usize,
    /// Meaning of the engine's processed-sample count (default: cumulative)
    #[serde(default)]
    pub processed_count: ProcessedCountMode,
    /// Output settings
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Audio output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Initial volume (default: 1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Highest accepted volume; `set_volume` clamps to `0.0..=max_volume` (default: 1.0)
    #[serde(default = "default_max_volume")]
    pub max_volume: f32,
}

fn default_samples_per_sec() -> u32 {
    48_000
}
fn default_mouth_reset_delay_ms() -> u64 {
    100
}
fn default_max_pending_samples() -> usize {
    96_000
}
fn default_volume() -> f32 {
    1.0
}
fn default_max_volume() -> f32 {
    1.0
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            samples_per_sec: default_samples_per_sec(),
            mouth_reset_delay_ms: default_mouth_reset_delay_ms(),
            max_pending_samples: default_max_pending_samples(),
            processed_count: ProcessedCountMode::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
            max_volume: default_max_volume(),
        }
    }
}

impl SyncConfig {
    /// Grace period before the mouth is closed after a segment ends
    pub fn mouth_reset_delay(&self) -> Duration {
        Duration::from_millis(self.mouth_reset_delay_ms)
    }

    /// Reads an explicit config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SyncError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| SyncError::InvalidConfig(format!("{}: {}", path.display(), e)))
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\MotionSync\config`
/// On macOS: `~/Library/Application Support/io.motionsync.MotionSync`
/// On Linux: `~/.config/MotionSync`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.motionsync", "", "MotionSync")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Loads the configuration from disk.
///
/// Reads `config.toml` from the platform's configuration directory.
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> SyncConfig {
    config_dir()
        .and_then(|dir| std::fs::read_to_string(dir.join("config.toml")).ok())
        .and_then(|content| toml::from_str(&content).ok())
        .unwrap_or_default()
}

/// Saves the configuration to disk.
///
/// Writes `config.toml` to the platform's configuration directory.
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file
/// cannot be written.
pub fn save(config: &SyncConfig) -> std::io::Result<()> {
    if let Some(dir) = config_dir() {
        save_to(config, &dir.join("config.toml"))?;
    }
    Ok(())
}

/// Writes `config` as pretty TOML to `path`, creating parent directories.
pub fn save_to(config: &SyncConfig, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, content)
}
