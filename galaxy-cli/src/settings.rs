//! Tool settings
//!
//! Read from `$GALAXY_SETTINGS` when set, otherwise from
//! `$XDG_CONFIG_HOME/galaxy/settings.json` or `~/.config/galaxy/settings.json`.
//! A missing file means defaults; every field is optional.

use std::path::{Path, PathBuf};
use std::time::Duration;

use galaxy_bus::BusTiming;
use galaxy_capture::{CaptureConfig, GapThresholds};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit settings file
pub const SETTINGS_ENV: &str = "GALAXY_SETTINGS";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Serial port path
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// How long the master collects a reply, in milliseconds
    pub reply_window_ms: u64,
    /// Per-read timeout inside the reply window, in milliseconds
    pub read_timeout_ms: u64,
    /// Per-read timeout while capturing, in microseconds
    pub capture_read_timeout_us: u64,
    /// Silence that separates master frames, in milliseconds
    pub inter_message_gap_ms: u64,
    /// Silence that ends a slave reply, in milliseconds
    pub slave_reply_gap_ms: u64,
    /// Print every read while capturing instead of frame summaries
    pub dump_reads: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            reply_window_ms: 100,
            read_timeout_ms: 10,
            capture_read_timeout_us: 500,
            inter_message_gap_ms: 10,
            slave_reply_gap_ms: 5,
            dump_reads: false,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for galaxy
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("galaxy"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("galaxy"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(SETTINGS_ENV) {
            return Some(PathBuf::from(explicit));
        }
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the usual location
    pub fn load() -> Result<Self, SettingsError> {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load settings from `path`, falling back to defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn bus_timing(&self) -> BusTiming {
        BusTiming {
            baud_rate: self.baud_rate,
            reply_window: Duration::from_millis(self.reply_window_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            thresholds: GapThresholds {
                inter_message: Duration::from_millis(self.inter_message_gap_ms),
                slave_reply: Duration::from_millis(self.slave_reply_gap_ms),
            },
            read_timeout: Duration::from_micros(self.capture_read_timeout_us),
            dump_reads: self.dump_reads,
        }
    }
}
