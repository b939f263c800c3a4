//! Durable snapshots for crash and power-loss recovery.
//!
//! Settings, the window state and the last record are stored as three
//! independent fixed-size files. Failures are reported to the caller, which
//! logs them and carries on with its in-memory state.

pub mod codec;
pub mod store;

// Re-export commonly used types
pub use codec::{Artifact, ArtifactKind};
pub use store::{PersistenceError, PersistenceStore};
