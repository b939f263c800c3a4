//! Deployment configuration for the press cycle agent.
//!
//! This covers where things live and how the agent talks to the outside
//! world. The engine's sizing and timing settings are kept separately as a
//! persisted snapshot (see [`crate::core::settings`]).

use crate::core::detector::SignalMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the persisted snapshots
    pub data_dir: PathBuf,

    /// Status input
    pub io: IoConfig,

    /// Scheduler cadence in milliseconds
    pub scheduler_tick_ms: u64,

    /// Outbound transport
    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("press-cycle-agent");

        Self {
            data_dir,
            io: IoConfig::default(),
            scheduler_tick_ms: 1000,
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults if it does
    /// not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("press-cycle-agent")
            .join("config.json")
    }

    /// Ensure the snapshot directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_dir).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_millis(self.scheduler_tick_ms.max(1))
    }
}

/// Where the status byte comes from and how to read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    /// File whose first byte is the device status
    pub status_path: PathBuf,
    /// Bit carrying the press level
    pub pressed_bit: u8,
    /// Bit carrying the power-down signal
    pub power_down_bit: u8,
    /// Poll period in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for IoConfig {
    fn default() -> Self {
        let signals = SignalMap::default();
        Self {
            status_path: PathBuf::from("/run/press-cycle/status"),
            pressed_bit: signals.pressed_bit,
            power_down_bit: signals.power_down_bit,
            poll_interval_ms: 10,
        }
    }
}

impl IoConfig {
    pub fn signals(&self) -> SignalMap {
        SignalMap {
            pressed_bit: self.pressed_bit,
            power_down_bit: self.power_down_bit,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Outbound transport selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    /// Log batches only
    #[default]
    Log,
    /// Write each batch to `payload_path` and run `program` with `args`
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        payload_path: PathBuf,
    },
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
