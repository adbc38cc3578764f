//! Configuration module for the UTM interface
//!
//! This module handles application configuration including:
//! - Static configuration ([`AppConfig`]) loaded from an optional TOML file
//! - Application state persistence ([`AppState`]: last port, geometry, export folder)
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.utm-rs/`
//! - **macOS**: `~/Library/Application Support/dev.utm-rs/`
//! - **Windows**: `%APPDATA%\dev.utm-rs\`
//!
//! # Files
//!
//! - `config.toml` - Optional configuration overrides
//! - `app_state.json` - Remembered choices from the last run
//! - `logs/` - Rolling log files when file logging is enabled

use crate::error::{Result, UtmError};
use crate::types::SampleGeometry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.utm-rs";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Configuration filename
pub const CONFIG_FILE: &str = "config.toml";

/// Default sleep when no bytes are waiting, in milliseconds
pub const DEFAULT_IDLE_SLEEP_MS: u64 = 5;

/// Default capacity of the worker → UI message queue
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Default prefix for exported files
pub const DEFAULT_EXPORT_PREFIX: &str = "utm_test_data";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        UtmError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            UtmError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Get the path to the optional configuration file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

// ==================== App Config ====================

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,

    /// Specimen geometry used at startup
    #[serde(default)]
    pub geometry: SampleGeometry,

    /// Acquisition loop tuning
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Export defaults
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging options
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            UtmError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            UtmError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from the app data directory, falling back to defaults
    pub fn load_or_default() -> Self {
        match config_path() {
            Some(path) if path.exists() => Self::load(&path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                UtmError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| UtmError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            UtmError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values the backend cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.geometry.is_valid() {
            return Err(UtmError::Config(
                "geometry area and length must be positive".to_string(),
            ));
        }
        if self.acquisition.channel_capacity == 0 {
            return Err(UtmError::Config(
                "channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Serial Config ====================

/// Serial link configuration
///
/// Baud rate and timeout are fixed by the firmware and not configurable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    /// Port to preselect (e.g., "/dev/ttyUSB0" or "COM3")
    #[serde(default)]
    pub port_name: Option<String>,
}

// ==================== Acquisition Config ====================

/// Acquisition loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcquisitionConfig {
    /// Sleep when the port has nothing to read
    #[serde(default = "default_idle_sleep_ms")]
    pub idle_sleep_ms: u64,

    /// Capacity of the worker → UI message queue
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_idle_sleep_ms() -> u64 {
    DEFAULT_IDLE_SLEEP_MS
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            idle_sleep_ms: DEFAULT_IDLE_SLEEP_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

// ==================== Export Config ====================

/// Export configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Folder offered in the save dialog
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Prefix of the suggested filename
    #[serde(default = "default_export_prefix")]
    pub filename_prefix: String,
}

fn default_export_prefix() -> String {
    DEFAULT_EXPORT_PREFIX.to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            filename_prefix: DEFAULT_EXPORT_PREFIX.to_string(),
        }
    }
}

// ==================== Logging Config ====================

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingConfig {
    /// Also write logs to daily files under the app data directory
    #[serde(default)]
    pub log_to_file: bool,
}

// ==================== App State ====================

/// Persistent application state
///
/// Remembers operator choices across runs. Test data is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Last port that connected successfully
    #[serde(default)]
    pub last_port: Option<String>,

    /// Last geometry that was applied
    #[serde(default)]
    pub last_geometry: Option<SampleGeometry>,

    /// Folder of the last export
    #[serde(default)]
    pub last_export_dir: Option<PathBuf>,

    /// UI preferences
    #[serde(default)]
    pub ui_preferences: UiPreferences,
}

fn default_app_state_version() -> u32 {
    1
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_port: None,
            last_geometry: None,
            last_export_dir: None,
            ui_preferences: UiPreferences::default(),
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            UtmError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load app state from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| UtmError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| UtmError::Config(format!("Failed to parse app state: {}", e)))
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
        self.save_to(&dir.join(APP_STATE_FILE))
    }

    /// Save app state to a specific file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| UtmError::Config(format!("Failed to serialize app state: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| UtmError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Apply remembered choices on top of a configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if config.serial.port_name.is_none() {
            config.serial.port_name = self.last_port.clone();
        }
        if let Some(geometry) = self.last_geometry.filter(|g| g.is_valid()) {
            config.geometry = geometry;
        }
        if config.export.directory.is_none() {
            config.export.directory = self.last_export_dir.clone();
        }
    }
}

/// UI preferences that persist across runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiPreferences {
    /// Enable dark mode
    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

fn default_true() -> bool {
    true
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self { dark_mode: true }
    }
}

// ==================== Tests ====================
