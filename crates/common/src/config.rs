//! Application configuration.
//!
//! Settings are stored as plain strings and numbers so the file stays
//! readable and forward compatible. The session engine turns these into
//! validated configs before a session starts.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where recordings are saved by default.
    pub recordings_dir: PathBuf,

    /// Auto-clicker settings.
    pub clicker: ClickerSettings,

    /// Macro playback settings.
    pub playback: PlaybackSettings,

    /// Global hotkey bindings.
    pub hotkeys: HotkeySettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Persisted auto-clicker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickerSettings {
    /// Nominal time between clicks in milliseconds.
    pub interval_ms: u64,

    /// Symmetric random offset bound in milliseconds (0 disables jitter).
    pub jitter_ms: i64,

    /// "left", "right" or "middle".
    pub button: String,

    /// "single" or "double".
    pub click_type: String,

    /// "until_stopped" or "count".
    pub repeat_mode: String,

    /// Number of clicks when `repeat_mode` is "count".
    pub repeat_count: u32,

    /// Click at this screen coordinate instead of the current cursor.
    pub fixed_position: Option<[i32; 2]>,
}

/// Persisted playback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Speed label, e.g. "0.5x", "1x", "2x", "4x".
    pub speed: String,

    /// "once", "count" or "continuous".
    pub loop_mode: String,

    /// Number of passes when `loop_mode` is "count".
    pub loop_count: u32,
}

/// Key names bound to the coordinator entry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeySettings {
    pub autoclicker: String,
    pub record: String,
    pub playback: String,
    pub stop: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "macrokit=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            recordings_dir: default_recordings_dir(),
            clicker: ClickerSettings::default(),
            playback: PlaybackSettings::default(),
            hotkeys: HotkeySettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ClickerSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            jitter_ms: 0,
            button: "left".to_string(),
            click_type: "single".to_string(),
            repeat_mode: "until_stopped".to_string(),
            repeat_count: 1,
            fixed_position: None,
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: "1x".to_string(),
            loop_mode: "once".to_string(),
            loop_count: 1,
        }
    }
}

impl Default for HotkeySettings {
    fn default() -> Self {
        Self {
            autoclicker: "F6".to_string(),
            record: "F9".to_string(),
            playback: "F10".to_string(),
            stop: "F11".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl HotkeySettings {
    /// All bound key names in action order: autoclicker, record, playback, stop.
    pub fn keys(&self) -> [&str; 4] {
        [
            self.autoclicker.as_str(),
            self.record.as_str(),
            self.playback.as_str(),
            self.stop.as_str(),
        ]
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<PathBuf, std::io::Error> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("macrokit").join("config.json")
}

/// Default recordings directory.
fn default_recordings_dir() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("macrokit").join("recordings")
}
