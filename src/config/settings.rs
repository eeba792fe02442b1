//! Logger settings
//!
//! [`AppConfig`] is the on-disk configuration (TOML). Every section and field
//! has a default, so a partial or empty file is valid.
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//!
//! [output]
//! path = "output.csv"
//! mode = "structured"
//! plot_field = "Current"
//!
//! [relay]
//! max_pending = 5000
//! ```

use crate::error::{LoggerError, Result};
use crate::relay::RelayMode;
use crate::session::SessionConfig;
use crate::sink::FlushPolicy;
use crate::source::{PortSettings, DEFAULT_BAUD_RATE};
use crate::types::{ParserMode, DEFAULT_WINDOW_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default log file name
pub const DEFAULT_OUTPUT_FILE: &str = "output.csv";

/// Default poll interval of the acquisition loop in milliseconds
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;

/// Default refresh interval of the presentation side in milliseconds
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 100;

/// Default visible span of a live plot in seconds
pub const DEFAULT_DISPLAY_SPAN_SECS: f64 = 10.0;

/// Complete logger configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub output: OutputConfig,
    pub window: WindowConfig,
    pub relay: RelayConfig,
    pub presentation: PresentationConfig,
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    pub baud_rate: u32,
    /// How long one read may block before the stop flag is re-checked
    pub poll_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
        }
    }
}

impl SerialConfig {
    pub fn port_settings(&self) -> PortSettings {
        PortSettings::new(self.port.clone(), self.baud_rate)
            .with_poll_timeout(Duration::from_millis(self.poll_timeout_ms))
    }
}

/// Log file settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub mode: ParserMode,
    /// Structured field plotted in the live window
    pub plot_field: Option<String>,
    pub flush: FlushPolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_OUTPUT_FILE),
            mode: ParserMode::default(),
            plot_field: None,
            flush: FlushPolicy::default(),
        }
    }
}

/// Live window settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Maximum number of samples kept
    pub capacity: usize,
    /// Visible x-axis span of a live plot
    pub display_span_secs: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_WINDOW_CAPACITY,
            display_span_secs: DEFAULT_DISPLAY_SPAN_SECS,
        }
    }
}

/// Display relay settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Undisplayed lines to keep before dropping the oldest; unbounded if unset
    pub max_pending: Option<usize>,
}

impl RelayConfig {
    pub fn mode(&self) -> RelayMode {
        RelayMode::from_limit(self.max_pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub refresh_interval_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

impl PresentationConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms.max(1))
    }
}

impl AppConfig {
    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LoggerError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            LoggerError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load a configuration file, returning defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("{}; using defaults", e);
            Self::default()
        })
    }

    /// Save as TOML, creating the parent directory if needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                LoggerError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| LoggerError::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            LoggerError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Session settings described by this configuration
    pub fn session_config(&self) -> SessionConfig {
        let mut session = SessionConfig::new(self.serial.port_settings(), self.output.path.clone())
            .with_mode(self.output.mode)
            .with_flush(self.output.flush);
        session.plot_field = self.output.plot_field.clone();
        session
    }
}
