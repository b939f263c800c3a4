//! Batch publishing and periodic persistence.

pub mod scheduler;
pub mod transport;

// Re-export commonly used types
pub use scheduler::{PublishObserver, PublishScheduler, SchedulerHandle, TickOutcome};
pub use transport::{
    build_transport, device_id, CommandTransport, LogTransport, PublishPayload, Transport,
    TransportError,
};
