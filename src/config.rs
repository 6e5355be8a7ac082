//! Configuration for the pipeline and persisted application state
//!
//! Two kinds of configuration live here:
//!
//! - [`PipelineConfig`] - runtime sizing of the pipeline (baud defaults,
//!   window capacity, queue bounds), serialized as TOML wherever the
//!   embedding application keeps its settings
//! - [`AppState`] - persisted application state (recently used ports),
//!   stored as JSON in the platform-appropriate data directory
//!
//! # App Data Location
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.serialvis-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.serialvis-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.serialvis-rs\`

use crate::error::{Result, SerialVisError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.serialvis-rs";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Maximum number of recent ports to remember
pub const MAX_RECENT_PORTS: usize = 10;

/// Runtime sizing of the acquisition pipeline
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Serial link settings
    #[serde(default)]
    pub link: LinkConfig,
    /// Visualization window settings
    #[serde(default)]
    pub window: WindowConfig,
    /// Recorder settings
    #[serde(default)]
    pub recorder: RecorderConfig,
    /// Diagnostic log settings
    #[serde(default)]
    pub log: LogConfig,
}

impl PipelineConfig {
    /// Load a configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&contents)
            .map_err(|e| SerialVisError::Config(format!("invalid config: {}", e)))
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| SerialVisError::Config(format!("serialize failed: {}", e)))?;
        std::fs::write(path.as_ref(), contents)?;
        Ok(())
    }
}

/// Serial link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Baud rate offered as the default choice
    pub default_baud: u32,
    /// Bytes requested per transport read
    pub read_chunk_size: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            default_baud: 115_200,
            read_chunk_size: 4096,
        }
    }
}

/// Visualization window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Number of samples retained for plotting
    pub capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: crate::window::DEFAULT_WINDOW_CAPACITY,
        }
    }
}

/// Recorder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderConfig {
    /// Bounded sample queue capacity between dispatcher and writer thread
    pub queue_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            queue_capacity: crate::dispatch::DEFAULT_SAMPLE_QUEUE_CAPACITY,
        }
    }
}

/// Diagnostic log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Maximum retained log entries
    pub capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            capacity: crate::eventlog::DEFAULT_LOG_CAPACITY,
        }
    }
}

/// Platform data directory for this application
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|dir| dir.join(APP_ID))
}

/// Path of the persisted app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(APP_STATE_FILE))
}

/// A recently used serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentPort {
    /// Port name (e.g. `/dev/ttyUSB0`, `COM3`)
    pub name: String,
    /// Baud rate last used with this port
    pub baud: u32,
    /// When the port was last opened
    pub last_used: DateTime<Utc>,
}

impl RecentPort {
    /// Create an entry stamped with the current time
    pub fn new(name: impl Into<String>, baud: u32) -> Self {
        Self {
            name: name.into(),
            baud,
            last_used: Utc::now(),
        }
    }

    /// Refresh the last-used timestamp
    pub fn touch(&mut self) {
        self.last_used = Utc::now();
    }
}

/// Persisted application state (recently used ports)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppState {
    /// Most recently used ports, newest first
    #[serde(default)]
    pub recent_ports: Vec<RecentPort>,
}

impl AppState {
    /// Load the app state from the platform data directory
    pub fn load() -> Result<Self> {
        let path = app_state_path()
            .ok_or_else(|| SerialVisError::Config("no data directory".to_string()))?;
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| SerialVisError::Config(format!("invalid app state: {}", e)))
    }

    /// Load the app state, falling back to defaults
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Save the app state to the platform data directory
    pub fn save(&self) -> Result<()> {
        let path = app_state_path()
            .ok_or_else(|| SerialVisError::Config("no data directory".to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| SerialVisError::Config(format!("serialize failed: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Remember a port, moving it to the front of the list
    pub fn add_recent_port(&mut self, name: &str, baud: u32) {
        if let Some(index) = self.recent_ports.iter().position(|p| p.name == name) {
            let mut port = self.recent_ports.remove(index);
            port.baud = baud;
            port.touch();
            self.recent_ports.insert(0, port);
        } else {
            self.recent_ports.insert(0, RecentPort::new(name, baud));
        }
        self.recent_ports.truncate(MAX_RECENT_PORTS);
    }

    /// The most recently used port, if any
    pub fn last_port(&self) -> Option<&RecentPort> {
        self.recent_ports.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.link.default_baud, 115_200);
        assert_eq!(config.link.read_chunk_size, 4096);
        assert!(config.window.capacity > 0);
        assert!(config.recorder.queue_capacity > 0);
        assert!(config.log.capacity > 0);
    }

    #[test]
    fn test_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");

        let mut config = PipelineConfig::default();
        config.window.capacity = 250;
        config.recorder.queue_capacity = 64;
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.window.capacity, 250);
        assert_eq!(loaded.recorder.queue_capacity, 64);
        assert_eq!(loaded.link.default_baud, 115_200);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[window]\ncapacity = 42\n").unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded.window.capacity, 42);
        assert_eq!(loaded.link.default_baud, 115_200);
    }

    #[test]
    fn test_recent_ports_dedupe_and_order() {
        let mut state = AppState::default();
        state.add_recent_port("/dev/ttyUSB0", 9600);
        state.add_recent_port("/dev/ttyACM0", 115_200);
        state.add_recent_port("/dev/ttyUSB0", 57_600);

        assert_eq!(state.recent_ports.len(), 2);
        assert_eq!(state.recent_ports[0].name, "/dev/ttyUSB0");
        assert_eq!(state.recent_ports[0].baud, 57_600);
        assert_eq!(state.last_port().unwrap().name, "/dev/ttyUSB0");
    }

    #[test]
    fn test_recent_ports_capped() {
        let mut state = AppState::default();
        for i in 0..(MAX_RECENT_PORTS + 5) {
            state.add_recent_port(&format!("/dev/ttyUSB{}", i), 9600);
        }
        assert_eq!(state.recent_ports.len(), MAX_RECENT_PORTS);
    }
}
