//! Configuration module for the serial logger
//!
//! This module handles:
//! - The logger configuration file ([`AppConfig`], TOML)
//! - Application state remembered between runs ([`AppState`], JSON)
//!
//! # Locations
//!
//! The configuration file lives in the platform config directory and the
//! application state in the platform data directory, both under
//! `serial-logger`:
//!
//! - **Linux**: `~/.config/serial-logger/config.toml`,
//!   `~/.local/share/serial-logger/app_state.json`
//! - **macOS**: `~/Library/Application Support/serial-logger/`
//! - **Windows**: `%APPDATA%\serial-logger\`
//!
//! # Example
//!
//! ```ignore
//! use serial_logger::config::{default_config_path, AppConfig, AppState};
//!
//! let mut config = default_config_path()
//!     .map(AppConfig::load_or_default)
//!     .unwrap_or_default();
//!
//! let mut state = AppState::load_or_default();
//! state.apply_to(&mut config);
//!
//! // ... run a session ...
//!
//! state.remember(&config);
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{LoggerError, Result};
use crate::source::VIRTUAL_PORT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Application directory name
pub const APP_ID: &str = "serial-logger";

/// Configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Maximum number of recent ports to remember
pub const MAX_RECENT_PORTS: usize = 10;

// ==================== Directories ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        LoggerError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            LoggerError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Default path of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

// ==================== Recent Port Entry ====================

/// A port used in an earlier run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPort {
    pub port: String,
    pub baud_rate: u32,
    /// Last used timestamp (Unix seconds)
    pub last_used: u64,
}

impl RecentPort {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            last_used: unix_now(),
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ==================== App State ====================

/// Settings remembered between runs
///
/// Used to fill in whatever the command line leaves out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Most recently used ports, newest first
    #[serde(default)]
    pub recent_ports: Vec<RecentPort>,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            recent_ports: Vec::new(),
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            LoggerError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(path)
    }

    /// Load app state from `path`; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| LoggerError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| LoggerError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            LoggerError::Serialization(format!("Failed to serialize app state: {}", e))
        })?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| LoggerError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Add or refresh a recent port
    ///
    /// The placeholder [`VIRTUAL_PORT`] of replay and mock sessions is skipped.
    pub fn add_recent_port(&mut self, port: &str, baud_rate: u32) {
        if port.is_empty() || port == VIRTUAL_PORT {
            return;
        }
        self.recent_ports.retain(|p| p.port != port);
        self.recent_ports.insert(0, RecentPort::new(port, baud_rate));
        self.recent_ports.truncate(MAX_RECENT_PORTS);
    }

    /// Most recently used port
    pub fn last_port(&self) -> Option<&RecentPort> {
        self.recent_ports.first()
    }

    /// Record the settings of a session that was started
    pub fn remember(&mut self, config: &AppConfig) {
        self.add_recent_port(&config.serial.port, config.serial.baud_rate);
    }

    /// Fill in the port when the configuration has none
    pub fn apply_to(&self, config: &mut AppConfig) {
        if config.serial.port.is_empty() {
            if let Some(last) = self.last_port() {
                config.serial.port = last.port.clone();
                config.serial.baud_rate = last.baud_rate;
            }
        }
    }
}
