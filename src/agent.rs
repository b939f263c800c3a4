//! Shared engine state used by the poll loop and the publish scheduler.
//!
//! One [`AgentContext`] is built at start-up and handed to both threads in an
//! `Arc`. Settings are immutable once it exists; the window and the last
//! record sit behind one mutex, and the queue carries its own.

use crate::core::queue::{Batch, RecordQueue};
use crate::core::settings::{Override, Settings};
use crate::core::window::{Record, SlidingWindowStats};
use crate::persistence::{PersistenceError, PersistenceStore};
use crate::stats::{AgentStats, SharedAgentStats};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The moving-average window together with the most recent record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowCell {
    pub window: SlidingWindowStats,
    pub last_record: Record,
}

pub struct AgentContext {
    settings: Settings,
    window: Mutex<WindowCell>,
    // Held from snapshot to last write so saves land whole and in order.
    save_lock: Mutex<()>,
    queue: RecordQueue,
    store: PersistenceStore,
    stats: SharedAgentStats,
}

pub type SharedContext = Arc<AgentContext>;

impl AgentContext {
    /// Create a context with an empty window.
    pub fn new(settings: Settings, store: PersistenceStore) -> Self {
        Self {
            settings,
            window: Mutex::new(WindowCell {
                window: SlidingWindowStats::new(settings.window_sz),
                last_record: Record::default(),
            }),
            save_lock: Mutex::new(()),
            queue: RecordQueue::new(settings.queue_depth),
            store,
            stats: Arc::new(AgentStats::new()),
        }
    }

    /// Create a context and load the window and last record from the store.
    ///
    /// Anything that cannot be loaded is left at its empty default.
    pub fn restore(settings: Settings, store: PersistenceStore) -> Self {
        let context = Self::new(settings, store);
        {
            let mut cell = context.lock_window();

            match context.store.load::<SlidingWindowStats>() {
                Ok(Some(window)) if window.window_sz() == settings.window_sz => {
                    cell.window = window;
                }
                Ok(Some(window)) => {
                    tracing::warn!(
                        "Discarding saved window of size {} (configured size is {})",
                        window.window_sz(),
                        settings.window_sz
                    );
                }
                Ok(None) => {}
                Err(e) => context.report_persistence_failure(&e),
            }

            match context.store.load::<Record>() {
                Ok(Some(record)) => cell.last_record = record,
                Ok(None) => {}
                Err(e) => context.report_persistence_failure(&e),
            }
        }
        context
    }

    fn lock_window(&self) -> MutexGuard<'_, WindowCell> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn queue(&self) -> &RecordQueue {
        &self.queue
    }

    pub fn store(&self) -> &PersistenceStore {
        &self.store
    }

    pub fn stats(&self) -> &SharedAgentStats {
        &self.stats
    }

    /// Copy of the current window and last record.
    pub fn window_cell(&self) -> WindowCell {
        self.lock_window().clone()
    }

    /// Fold a completed cycle into the window and queue its record.
    pub fn complete_cycle(&self, duration: u32) -> Record {
        let record = {
            let mut cell = self.lock_window();
            cell.window.update(duration);
            cell.last_record = cell.window.snapshot();
            cell.last_record
        };

        self.stats.record_cycle();
        tracing::debug!(
            "Cycle #{} took {}s (average {}s)",
            record.count,
            record.last_duration,
            record.windowed_average
        );

        if let Some(dropped) = self.queue.push(record) {
            self.stats.record_dropped();
            tracing::debug!("Queue full, dropped unpublished record #{}", dropped.count);
        }
        record
    }

    /// Pop every queued record.
    pub fn drain_queue(&self) -> Batch {
        self.queue.drain()
    }

    /// Re-snapshot the window and persist it together with the last record.
    ///
    /// Failures are logged and counted; returns whether both writes succeeded.
    pub fn save_snapshot(&self) -> bool {
        let _saving = self.save_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let (window, record) = {
            let mut cell = self.lock_window();
            cell.last_record = cell.window.snapshot();
            (cell.window.clone(), cell.last_record)
        };

        let mut ok = true;
        for result in [self.store.save(&record), self.store.save(&window)] {
            match result {
                Ok(()) => self.stats.record_snapshot_saved(),
                Err(e) => {
                    self.report_persistence_failure(&e);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Save immediately in response to the power-down signal.
    pub fn handle_power_down(&self) {
        self.stats.record_power_down();
        self.save_snapshot();
        tracing::info!("Power-down initiated");
        self.log_operating_data();
    }

    fn report_persistence_failure(&self, error: &PersistenceError) {
        self.stats.record_persistence_failure();
        tracing::warn!("{error}");
    }

    /// Operating data for display.
    pub fn operating_data(&self) -> OperatingData {
        let cell = self.window_cell();
        OperatingData {
            settings: self.settings,
            last_record: cell.last_record,
            samples: cell.window.samples().to_vec(),
        }
    }

    pub fn log_operating_data(&self) {
        tracing::info!("{}", self.operating_data());
    }
}

/// Start-up settings: defaults overlaid by the persisted snapshot.
///
/// A snapshot that is missing, unreadable or outside the compiled limits is
/// ignored.
pub fn load_settings(store: &PersistenceStore) -> Settings {
    match store.load::<Settings>() {
        Ok(Some(settings)) if settings.is_within_limits() => settings,
        Ok(Some(settings)) => {
            tracing::warn!("Ignoring saved settings outside limits: {settings:?}");
            Settings::default()
        }
        Ok(None) => Settings::default(),
        Err(e) => {
            tracing::warn!("{e}");
            Settings::default()
        }
    }
}

/// Apply overrides in order, persisting the settings after each accepted one.
///
/// Rejected overrides leave the previous value in place. Returns the number
/// of overrides accepted.
pub fn apply_overrides(
    settings: &mut Settings,
    overrides: &[Override],
    store: &PersistenceStore,
) -> usize {
    let mut accepted = 0;
    for &change in overrides {
        match settings.apply(change) {
            Ok(()) => {
                accepted += 1;
                if let Err(e) = store.save(&*settings) {
                    tracing::warn!("{e}");
                }
            }
            Err(e) => tracing::debug!("Override {change:?} rejected: {e}"),
        }
    }
    accepted
}

/// Settings, last record and window contents, as shown at power-up,
/// power-down and by the `status` command.
#[derive(Debug, Clone)]
pub struct OperatingData {
    pub settings: Settings,
    pub last_record: Record,
    pub samples: Vec<u32>,
}

impl std::fmt::Display for OperatingData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = &self.settings;
        writeln!(
            f,
            "Settings - WindowSz:{}, QueueDepth:{}, TxPeriod:{}s, SavePeriod:{}s, LogLevel:{}",
            s.window_sz, s.queue_depth, s.tx_period_s, s.save_period_s, s.log_level
        )?;
        writeln!(
            f,
            "Last Record - TotalCount:{}, LastCycleTime:{}, AvgCycleTime:{}",
            self.last_record.count, self.last_record.last_duration, self.last_record.windowed_average
        )?;
        let values: Vec<String> = self.samples.iter().map(u32::to_string).collect();
        write!(f, "Window Values: {}", values.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> PersistenceStore {
        PersistenceStore::new(
            std::env::temp_dir().join(format!("press-cycle-agent-{}", uuid::Uuid::new_v4())),
        )
    }

    fn settings(window_sz: u32, queue_depth: u32) -> Settings {
        let mut settings = Settings::default();
        settings.apply(Override::WindowSize(window_sz)).unwrap();
        settings.apply(Override::QueueDepth(queue_depth)).unwrap();
        settings
    }

    #[test]
    fn test_complete_cycle_updates_window_and_queue() {
        let context = AgentContext::new(settings(3, 5), temp_store());
        context.complete_cycle(5);
        context.complete_cycle(7);
        let record = context.complete_cycle(9);

        assert_eq!(record.count, 3);
        assert_eq!(record.windowed_average, 7);
        assert_eq!(context.window_cell().last_record, record);
        assert_eq!(context.queue().len(), 3);
        assert_eq!(context.stats().stats().cycles_completed, 3);
    }

    #[test]
    fn test_queue_overflow_is_counted() {
        let context = AgentContext::new(settings(3, 2), temp_store());
        for duration in [1, 2, 3] {
            context.complete_cycle(duration);
        }
        assert_eq!(context.stats().stats().records_dropped, 1);
        assert_eq!(context.drain_queue().len(), 2);
    }

    #[test]
    fn test_snapshot_survives_restart() {
        let store = temp_store();
        let dir = store.dir().to_path_buf();
        let context = AgentContext::new(settings(4, 5), store);
        for duration in [10, 20, 30, 40, 50] {
            context.complete_cycle(duration);
        }
        assert!(context.save_snapshot());
        let before = context.window_cell();

        let restored = AgentContext::restore(settings(4, 5), PersistenceStore::new(&dir));
        assert_eq!(restored.window_cell(), before);
        // Unpublished records are not persisted
        assert!(restored.queue().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_restore_discards_window_of_other_size() {
        let store = temp_store();
        let dir = store.dir().to_path_buf();
        let context = AgentContext::new(settings(4, 5), store);
        context.complete_cycle(10);
        context.save_snapshot();

        let restored = AgentContext::restore(settings(8, 5), PersistenceStore::new(&dir));
        let cell = restored.window_cell();
        assert_eq!(cell.window.window_sz(), 8);
        assert_eq!(cell.window.lifetime_count(), 0);
        // The last record is independent of the window
        assert_eq!(cell.last_record.count, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_restore_without_snapshots_starts_empty() {
        let context = AgentContext::restore(settings(4, 5), temp_store());
        let cell = context.window_cell();
        assert_eq!(cell.window, SlidingWindowStats::new(4));
        assert_eq!(cell.last_record, Record::default());
    }

    #[test]
    fn test_power_down_saves_snapshot() {
        let store = temp_store();
        let dir = store.dir().to_path_buf();
        let context = AgentContext::new(settings(3, 5), store);
        context.complete_cycle(6);
        context.handle_power_down();

        let saved: Record = PersistenceStore::new(&dir).load().unwrap().unwrap();
        assert_eq!(saved.count, 1);
        assert_eq!(saved.last_duration, 6);
        assert_eq!(context.stats().stats().power_down_events, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_power_down_snapshot_not_overwritten_by_concurrent_save() {
        use std::sync::atomic::{AtomicBool, Ordering};

        for _ in 0..20 {
            let store = temp_store();
            let dir = store.dir().to_path_buf();
            let context = Arc::new(AgentContext::new(settings(8, 5), store));
            let running = Arc::new(AtomicBool::new(true));

            let saver = {
                let context = context.clone();
                let running = running.clone();
                std::thread::spawn(move || {
                    while running.load(Ordering::SeqCst) {
                        context.save_snapshot();
                    }
                })
            };

            for duration in 0..50 {
                context.complete_cycle(duration % 9);
            }
            context.handle_power_down();
            running.store(false, Ordering::SeqCst);
            saver.join().unwrap();

            let reloaded = PersistenceStore::new(&dir);
            let record: Record = reloaded.load().unwrap().unwrap();
            let window: SlidingWindowStats = reloaded.load().unwrap().unwrap();
            assert_eq!(record.count, 50);
            assert_eq!(window.lifetime_count(), record.count);
            assert_eq!(window.snapshot(), record);

            let _ = std::fs::remove_dir_all(&dir);
        }
    }

    #[test]
    fn test_accepted_override_is_persisted() {
        let store = temp_store();
        let mut settings = Settings::default();

        let accepted = apply_overrides(&mut settings, &[Override::WindowSize(50)], &store);
        assert_eq!(accepted, 1);
        assert_eq!(settings.window_sz, 50);
        assert_eq!(load_settings(&store).window_sz, 50);

        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_rejected_override_is_not_persisted() {
        let store = temp_store();
        let mut settings = Settings::default();

        let accepted = apply_overrides(&mut settings, &[Override::WindowSize(150)], &store);
        assert_eq!(accepted, 0);
        assert_eq!(settings.window_sz, 100);
        assert!(store.load::<Settings>().unwrap().is_none());
    }

    #[test]
    fn test_out_of_limit_saved_settings_are_ignored() {
        let store = temp_store();
        let bogus = Settings {
            window_sz: 500,
            ..Settings::default()
        };
        store.save(&bogus).unwrap();
        assert_eq!(load_settings(&store), Settings::default());

        let _ = std::fs::remove_dir_all(store.dir());
    }

    #[test]
    fn test_operating_data_display() {
        let context = AgentContext::new(settings(3, 5), temp_store());
        context.complete_cycle(4);
        let text = context.operating_data().to_string();
        assert!(text.contains("WindowSz:3"));
        assert!(text.contains("TotalCount:1"));
        assert!(text.contains("Window Values: 4 0 0"));
    }
}
