//! Session counters for the agent.
//!
//! Counters are lock-free and shared between the poll loop and the scheduler.
//! They cover things the engine otherwise handles silently, such as records
//! dropped when the queue overflows.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub struct AgentStats {
    cycles_completed: AtomicU64,
    records_dropped: AtomicU64,
    batches_published: AtomicU64,
    records_published: AtomicU64,
    publish_failures: AtomicU64,
    snapshots_saved: AtomicU64,
    persistence_failures: AtomicU64,
    power_down_events: AtomicU64,
    session_start: DateTime<Utc>,
}

impl AgentStats {
    pub fn new() -> Self {
        Self {
            cycles_completed: AtomicU64::new(0),
            records_dropped: AtomicU64::new(0),
            batches_published: AtomicU64::new(0),
            records_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            snapshots_saved: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            power_down_events: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_cycle(&self) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch handed to the transport.
    pub fn record_published(&self, records: usize) {
        self.batches_published.fetch_add(1, Ordering::Relaxed);
        self.records_published
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_snapshot_saved(&self) {
        self.snapshots_saved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_power_down(&self) {
        self.power_down_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            records_dropped: self.records_dropped.load(Ordering::Relaxed),
            batches_published: self.batches_published.load(Ordering::Relaxed),
            records_published: self.records_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            snapshots_saved: self.snapshots_saved.load(Ordering::Relaxed),
            persistence_failures: self.persistence_failures.load(Ordering::Relaxed),
            power_down_events: self.power_down_events.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Cycles completed: {}\n\
             - Records dropped (queue full): {}\n\
             - Batches published: {} ({} records)\n\
             - Publish failures: {}\n\
             - Snapshots saved: {}\n\
             - Persistence failures: {}\n\
             - Power-down events: {}\n\
             - Session duration: {} seconds",
            stats.cycles_completed,
            stats.records_dropped,
            stats.batches_published,
            stats.records_published,
            stats.publish_failures,
            stats.snapshots_saved,
            stats.persistence_failures,
            stats.power_down_events,
            stats.session_duration_secs
        )
    }
}

impl Default for AgentStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the session counters.
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    pub cycles_completed: u64,
    pub records_dropped: u64,
    pub batches_published: u64,
    pub records_published: u64,
    pub publish_failures: u64,
    pub snapshots_saved: u64,
    pub persistence_failures: u64,
    pub power_down_events: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared counters.
pub type SharedAgentStats = Arc<AgentStats>;
