//! Core cycle-timing engine.
//!
//! This module contains:
//! - Settings with their compiled limits and override rules
//! - The sliding-window moving average over cycle durations
//! - The bounded record queue between the poll loop and the scheduler
//! - Edge detection on the device status byte

pub mod detector;
pub mod queue;
pub mod settings;
pub mod window;

// Re-export commonly used types
pub use detector::{CycleEventDetector, CycleState, SignalMap, Transitions};
pub use queue::{Batch, RecordQueue};
pub use settings::{Override, Settings, ValidationError, MAX_QUEUE_DEPTH, MAX_WINDOW_SZ};
pub use window::{Record, SlidingWindowStats};
