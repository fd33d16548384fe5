//! Configuration module for pipedeck
//!
//! Handles persistence of controller settings (agent endpoint, autosave
//! timing) across sessions. The working pipeline configuration itself is
//! never stored here: it lives on the agent and is only cached in memory by
//! the controller.
//!
//! # App Data Location
//!
//! Settings are stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.pipedeck/`
//! - **macOS**: `~/Library/Application Support/dev.pipedeck/`
//! - **Windows**: `%APPDATA%\dev.pipedeck\`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipedeckError, Result};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.pipedeck";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.json";

/// Default pipeline agent endpoint
pub const DEFAULT_AGENT_URL: &str = "http://localhost:18630";

/// Default autosave debounce delay in milliseconds
pub const DEFAULT_AUTOSAVE_DELAY_MS: u64 = 1000;

/// Default timeout for agent requests in milliseconds
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        PipedeckError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            PipedeckError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SETTINGS_FILE))
}

/// Persistent controller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    /// Version for future migration support
    #[serde(default = "default_settings_version")]
    pub version: u32,

    /// Base URL of the pipeline agent
    #[serde(default = "default_agent_url")]
    pub agent_url: String,

    /// Debounce delay between the last edit and the autosave request
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    /// Timeout applied to every agent request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_settings_version() -> u32 {
    1
}

fn default_agent_url() -> String {
    DEFAULT_AGENT_URL.to_string()
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            version: 1,
            agent_url: default_agent_url(),
            autosave_delay_ms: DEFAULT_AUTOSAVE_DELAY_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl ControllerSettings {
    /// Autosave debounce delay as a [`Duration`]
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Agent request timeout as a [`Duration`]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        let path = settings_path().ok_or_else(|| {
            PipedeckError::Config("Could not determine settings path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load settings from an explicit path, returning defaults when the file
    /// does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| PipedeckError::Config(format!("Failed to read settings: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| PipedeckError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Load settings, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(&dir.join(SETTINGS_FILE))
    }

    /// Save settings to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| PipedeckError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| PipedeckError::Config(format!("Failed to write settings: {}", e)))?;

        tracing::debug!("Saved controller settings to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.agent_url, DEFAULT_AGENT_URL);
        assert_eq!(settings.autosave_delay(), Duration::from_millis(1000));
        assert_eq!(settings.request_timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);

        let settings = ControllerSettings {
            agent_url: "http://agent:9000".to_string(),
            autosave_delay_ms: 250,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = ControllerSettings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ControllerSettings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(loaded, ControllerSettings::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "not json").unwrap();

        assert!(ControllerSettings::load_from(&path).is_err());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"agent_url": "http://other:18630"}"#).unwrap();

        let loaded = ControllerSettings::load_from(&path).unwrap();
        assert_eq!(loaded.agent_url, "http://other:18630");
        assert_eq!(loaded.autosave_delay_ms, DEFAULT_AUTOSAVE_DELAY_MS);
    }
}
