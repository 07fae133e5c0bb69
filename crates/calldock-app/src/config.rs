//! Persisted settings: `.calldock/config.toml`.
//!
//! Every field carries a serde default so partial files parse. A malformed
//! file is recoverable: it logs a warning and yields defaults rather than
//! refusing to start.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use calldock_core::prelude::*;
use calldock_core::types::MediaDeviceKind;

const CONFIG_FILENAME: &str = "config.toml";
pub const CALLDOCK_DIR: &str = ".calldock";

/// Screen corner the floating widget docks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Credentials replayed on startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedLogin {
    pub user_id: String,
    pub access_token: Option<String>,
}

impl Default for SavedLogin {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            access_token: None,
        }
    }
}

/// Remembered device choice per kind.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub audio_input: Option<String>,
    pub audio_output: Option<String>,
    pub video_input: Option<String>,
}

impl DeviceSettings {
    pub fn get(&self, kind: MediaDeviceKind) -> Option<&str> {
        match kind {
            MediaDeviceKind::AudioInput => self.audio_input.as_deref(),
            MediaDeviceKind::AudioOutput => self.audio_output.as_deref(),
            MediaDeviceKind::VideoInput => self.video_input.as_deref(),
        }
    }

    pub fn set(&mut self, kind: MediaDeviceKind, id: impl Into<String>) {
        let slot = match kind {
            MediaDeviceKind::AudioInput => &mut self.audio_input,
            MediaDeviceKind::AudioOutput => &mut self.audio_output,
            MediaDeviceKind::VideoInput => &mut self.video_input,
        };
        *slot = Some(id.into());
    }
}

/// Widget container preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub corner: Corner,
    /// Start with the widget visible instead of docked away.
    pub start_open: bool,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            corner: Corner::default(),
            start_open: true,
        }
    }
}

/// Root of the config file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app_id: String,
    pub endpoint: Option<String>,
    pub auto_login: Option<SavedLogin>,
    pub devices: DeviceSettings,
    pub widget: WidgetSettings,
}

/// `.calldock` under the host project directory, home directory as the
/// fallback when no project directory is given.
pub fn config_dir(project_dir: Option<&Path>) -> PathBuf {
    match project_dir {
        Some(dir) => dir.join(CALLDOCK_DIR),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CALLDOCK_DIR),
    }
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILENAME)
}

/// Load settings from `dir/config.toml`. Missing or malformed files yield
/// defaults; only the malformed case warns.
pub fn load_settings(dir: &Path) -> Settings {
    let path = config_path(dir);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(_) => {
            debug!("no config at {}, using defaults", path.display());
            return Settings::default();
        }
    };
    match toml::from_str(&raw) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("malformed config {}: {e}, using defaults", path.display());
            Settings::default()
        }
    }
}

/// Write settings to `dir/config.toml`, creating the directory if needed.
pub fn save_settings(dir: &Path, settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let raw = toml::to_string_pretty(settings)
        .map_err(|e| Error::config(format!("serialize settings: {e}")))?;
    std::fs::write(config_path(dir), raw)?;
    Ok(())
}
