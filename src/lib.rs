//! Press Cycle Agent - cycle timing and telemetry for mold presses.
//!
//! The agent polls one status byte from the press controller, times each
//! press-to-release cycle, keeps a moving average over recent cycles, and
//! periodically publishes the resulting records off the device.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Press Cycle Agent                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  poll thread (10 ms)                                         │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐   │
//! │  │ IoSource │──▶│ Detector │──▶│  Window  │──▶│  Record  │   │
//! │  │ (status) │   │ (edges)  │   │ (average)│   │  Queue   │   │
//! │  └──────────┘   └──────────┘   └──────────┘   └──────────┘   │
//! │                      │ power-down   │              │         │
//! │                      ▼              ▼              ▼         │
//! │               ┌─────────────┐  ┌──────────────────────┐      │
//! │               │ Persistence │◀─│  Publish Scheduler   │──▶ Transport
//! │               │  Snapshots  │  │  (tx + save timers)  │      │
//! │               └─────────────┘  └──────────────────────┘      │
//! │                                 scheduler thread (1 s)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Instant;
//! use press_cycle_agent::{agent, persistence, publish};
//!
//! let store = persistence::PersistenceStore::new("/var/lib/press-cycle-agent");
//! let settings = agent::load_settings(&store);
//! let context = Arc::new(agent::AgentContext::restore(settings, store));
//!
//! let scheduler = publish::PublishScheduler::new(
//!     context.clone(),
//!     Box::new(publish::LogTransport),
//!     Instant::now(),
//! );
//! let handle = scheduler.spawn(std::time::Duration::from_secs(1)).expect("spawn scheduler");
//!
//! context.complete_cycle(12);
//! handle.shutdown();
//! ```

pub mod agent;
pub mod config;
pub mod core;
pub mod io;
pub mod logging;
pub mod persistence;
pub mod poller;
pub mod publish;
pub mod stats;

// Re-export key types at crate root for convenience
pub use agent::{AgentContext, OperatingData, SharedContext};
pub use config::{Config, TransportConfig};
pub use crate::core::{
    Batch, CycleEventDetector, Override, Record, RecordQueue, Settings, SlidingWindowStats,
};
pub use io::{FileSource, IoSource, ScriptedSource};
pub use persistence::{ArtifactKind, PersistenceStore};
pub use poller::Poller;
pub use publish::{PublishScheduler, SchedulerHandle, Transport, TransportError};
pub use stats::{AgentStats, SharedAgentStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
