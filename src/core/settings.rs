//! Sizing and timing settings for the cycle engine.
//!
//! Settings are built once at start-up: compiled defaults, overlaid by the
//! persisted snapshot, overlaid by command-line overrides. They are never
//! mutated once the poll and scheduler threads are running.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest moving-average window the engine supports.
pub const MAX_WINDOW_SZ: u32 = 100;

/// Largest record queue the engine supports.
pub const MAX_QUEUE_DEPTH: u32 = 20;

/// Default transmit period (1 minute).
pub const DEFAULT_TX_PERIOD_SECS: u32 = 60;

/// Default save-to-storage period (15 minutes).
pub const DEFAULT_SAVE_PERIOD_SECS: u32 = 15 * 60;

pub const DEFAULT_LOG_LEVEL: u32 = 0;
pub const MAX_LOG_LEVEL: u32 = 3;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of cycle durations in the moving average
    pub window_sz: u32,
    /// Capacity of the record queue
    pub queue_depth: u32,
    /// Seconds between batch publishes
    pub tx_period_s: u32,
    /// Seconds between window snapshots
    pub save_period_s: u32,
    /// Verbosity from 0 (quiet) to 3 (trace)
    pub log_level: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_sz: MAX_WINDOW_SZ,
            queue_depth: MAX_QUEUE_DEPTH,
            tx_period_s: DEFAULT_TX_PERIOD_SECS,
            save_period_s: DEFAULT_SAVE_PERIOD_SECS,
            log_level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl Settings {
    /// Apply a single override.
    ///
    /// On rejection the previous value is kept and the settings are unchanged.
    pub fn apply(&mut self, change: Override) -> Result<(), ValidationError> {
        match change {
            // Window and queue sizes must stay strictly below their maxima when
            // set from the command line; zero would make the ring buffers unusable.
            Override::WindowSize(n) => {
                if n == 0 || n >= MAX_WINDOW_SZ {
                    return Err(ValidationError::OutOfRange {
                        field: "window_sz",
                        value: n,
                    });
                }
                self.window_sz = n;
            }
            Override::QueueDepth(n) => {
                if n == 0 || n >= MAX_QUEUE_DEPTH {
                    return Err(ValidationError::OutOfRange {
                        field: "queue_depth",
                        value: n,
                    });
                }
                self.queue_depth = n;
            }
            Override::TxPeriod(n) => self.tx_period_s = n,
            Override::SavePeriod(n) => self.save_period_s = n,
            Override::LogLevel(n) => {
                if n > MAX_LOG_LEVEL {
                    return Err(ValidationError::OutOfRange {
                        field: "log_level",
                        value: n,
                    });
                }
                self.log_level = n;
            }
        }
        Ok(())
    }

    /// Check that sizes fall within the compiled limits.
    ///
    /// Used on settings read back from storage, which may be stale or damaged.
    pub fn is_within_limits(&self) -> bool {
        (1..=MAX_WINDOW_SZ).contains(&self.window_sz)
            && (1..=MAX_QUEUE_DEPTH).contains(&self.queue_depth)
            && self.log_level <= MAX_LOG_LEVEL
    }

    pub fn tx_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.tx_period_s))
    }

    pub fn save_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.save_period_s))
    }

    /// `tracing` filter directive matching the configured verbosity.
    pub fn log_directive(&self) -> &'static str {
        match self.log_level {
            0 => "error",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// A single caller-supplied change to the settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    WindowSize(u32),
    QueueDepth(u32),
    TxPeriod(u32),
    SavePeriod(u32),
    LogLevel(u32),
}

/// Rejected override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    OutOfRange { field: &'static str, value: u32 },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::OutOfRange { field, value } => {
                write!(f, "{field} value {value} is out of range")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.window_sz, 100);
        assert_eq!(settings.queue_depth, 20);
        assert_eq!(settings.tx_period(), Duration::from_secs(60));
        assert_eq!(settings.save_period(), Duration::from_secs(900));
        assert_eq!(settings.log_level, 0);
        assert!(settings.is_within_limits());
    }

    #[test]
    fn test_window_override_bounds() {
        let mut settings = Settings::default();
        assert!(settings.apply(Override::WindowSize(50)).is_ok());
        assert_eq!(settings.window_sz, 50);

        assert!(settings.apply(Override::WindowSize(150)).is_err());
        assert!(settings.apply(Override::WindowSize(100)).is_err());
        assert!(settings.apply(Override::WindowSize(0)).is_err());
        assert_eq!(settings.window_sz, 50);
    }

    #[test]
    fn test_queue_and_log_level_bounds() {
        let mut settings = Settings::default();
        assert!(settings.apply(Override::QueueDepth(19)).is_ok());
        assert!(settings.apply(Override::QueueDepth(20)).is_err());
        assert_eq!(settings.queue_depth, 19);

        assert!(settings.apply(Override::LogLevel(3)).is_ok());
        assert!(settings.apply(Override::LogLevel(4)).is_err());
        assert_eq!(settings.log_level, 3);
    }

    #[test]
    fn test_periods_are_unchecked() {
        let mut settings = Settings::default();
        assert!(settings.apply(Override::TxPeriod(0)).is_ok());
        assert!(settings.apply(Override::SavePeriod(86_400)).is_ok());
        assert_eq!(settings.tx_period_s, 0);
        assert_eq!(settings.save_period_s, 86_400);
    }

    #[test]
    fn test_log_directive() {
        let mut settings = Settings::default();
        assert_eq!(settings.log_directive(), "error");
        settings.log_level = 2;
        assert_eq!(settings.log_directive(), "debug");
    }
}
