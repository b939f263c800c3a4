//! Background publish/save scheduler.
//!
//! Wakes once per tick and checks two independent timers against the
//! monotonic clock: the transmit timer drains the record queue into a batch
//! for the transport, and the save timer snapshots the window to storage.

use crate::agent::SharedContext;
use crate::core::queue::Batch;
use crate::publish::transport::{Transport, TransportError};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default scheduler cadence.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Called after every publish attempt with the batch and its outcome.
pub type PublishObserver = Box<dyn Fn(&Batch, &Result<(), TransportError>) + Send>;

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Records handed to the transport (0 when nothing was published)
    pub published: usize,
    /// Whether the save timer fired
    pub saved: bool,
}

pub struct PublishScheduler {
    context: SharedContext,
    transport: Box<dyn Transport>,
    observer: Option<PublishObserver>,
    last_tx: Instant,
    last_save: Instant,
}

impl PublishScheduler {
    /// Create a scheduler whose timers start at `now`.
    pub fn new(context: SharedContext, transport: Box<dyn Transport>, now: Instant) -> Self {
        Self {
            context,
            transport,
            observer: None,
            last_tx: now,
            last_save: now,
        }
    }

    pub fn with_observer(mut self, observer: PublishObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Check both timers at `now` and run whatever has expired.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let settings = *self.context.settings();
        let mut outcome = TickOutcome::default();

        if now.saturating_duration_since(self.last_tx) >= settings.tx_period() {
            tracing::debug!("Transmit timer fired");
            self.last_tx = now;
            outcome.published = self.publish_pending();
        }

        if now.saturating_duration_since(self.last_save) >= settings.save_period() {
            self.last_save = now;
            if self.context.save_snapshot() {
                tracing::info!("Data saved to storage");
            }
            outcome.saved = true;
        }

        outcome
    }

    /// Drain the queue and publish it as one batch. Returns the batch size.
    pub fn publish_pending(&mut self) -> usize {
        let batch = self.context.drain_queue();
        if batch.is_empty() {
            return 0;
        }

        let result = self.transport.publish(&batch);
        match &result {
            Ok(()) => self.context.stats().record_published(batch.len()),
            Err(e) => {
                self.context.stats().record_publish_failure();
                tracing::warn!("Publish of {} records failed: {e}", batch.len());
            }
        }

        if let Some(ref observer) = self.observer {
            observer(&batch, &result);
        }
        batch.len()
    }

    /// Run the scheduler on its own thread, ticking every `tick`.
    ///
    /// On shutdown the thread publishes whatever is still queued and saves a
    /// final snapshot before exiting.
    pub fn spawn(mut self, tick: Duration) -> std::io::Result<SchedulerHandle> {
        let (shutdown, signal) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("publish-scheduler".to_string())
            .spawn(move || {
                loop {
                    match signal.recv_timeout(tick) {
                        Err(RecvTimeoutError::Timeout) => {
                            self.tick(Instant::now());
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }

                let flushed = self.publish_pending();
                if flushed > 0 {
                    tracing::info!("Flushed {flushed} records on shutdown");
                }
                self.context.save_snapshot();
            })?;

        Ok(SchedulerHandle {
            shutdown,
            thread: Some(thread),
        })
    }
}

/// Handle to a running scheduler thread.
///
/// Dropping the handle stops and joins the thread.
pub struct SchedulerHandle {
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal the scheduler to stop and wait for it to finish.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.shutdown.try_send(());
            if thread.join().is_err() {
                tracing::error!("Publish scheduler thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentContext;
    use crate::core::settings::{Override, Settings};
    use crate::persistence::PersistenceStore;
    use std::sync::{Arc, Mutex};

    /// Transport that records every batch it is given.
    #[derive(Clone, Default)]
    struct RecordingTransport {
        batches: Arc<Mutex<Vec<Batch>>>,
        fail: bool,
    }

    impl Transport for RecordingTransport {
        fn publish(&mut self, batch: &Batch) -> Result<(), TransportError> {
            self.batches.lock().unwrap().push(batch.clone());
            if self.fail {
                Err(TransportError::Serialization("refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn context(tx: u32, save: u32) -> SharedContext {
        let mut settings = Settings::default();
        settings.apply(Override::WindowSize(3)).unwrap();
        settings.apply(Override::QueueDepth(4)).unwrap();
        settings.apply(Override::TxPeriod(tx)).unwrap();
        settings.apply(Override::SavePeriod(save)).unwrap();
        let store = PersistenceStore::new(
            std::env::temp_dir().join(format!("press-cycle-sched-{}", uuid::Uuid::new_v4())),
        );
        Arc::new(AgentContext::new(settings, store))
    }

    #[test]
    fn test_transmit_timer_drains_queue_into_one_batch() {
        let context = context(60, 900);
        let transport = RecordingTransport::default();
        let t0 = Instant::now();
        let mut scheduler = PublishScheduler::new(context.clone(), Box::new(transport.clone()), t0);

        context.complete_cycle(4);
        context.complete_cycle(6);

        assert_eq!(scheduler.tick(t0 + Duration::from_secs(59)).published, 0);
        let outcome = scheduler.tick(t0 + Duration::from_secs(60));
        assert_eq!(outcome.published, 2);
        assert!(!outcome.saved);

        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let counts: Vec<u32> = batches[0].records().iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![1, 2]);
        assert!(context.queue().pop().is_none());
    }

    #[test]
    fn test_empty_queue_publishes_nothing() {
        let context = context(1, 900);
        let transport = RecordingTransport::default();
        let t0 = Instant::now();
        let mut scheduler = PublishScheduler::new(context, Box::new(transport.clone()), t0);

        scheduler.tick(t0 + Duration::from_secs(5));
        assert!(transport.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_timers_are_independent() {
        let context = context(10, 25);
        let t0 = Instant::now();
        let mut scheduler =
            PublishScheduler::new(context.clone(), Box::new(RecordingTransport::default()), t0);

        let mut saves = Vec::new();
        for secs in 1..=50 {
            context.complete_cycle(1);
            let outcome = scheduler.tick(t0 + Duration::from_secs(secs));
            if outcome.saved {
                saves.push(secs);
            }
            if secs % 10 == 0 {
                assert_eq!(outcome.published, 4, "at {secs}s");
            } else {
                assert_eq!(outcome.published, 0, "at {secs}s");
            }
        }
        assert_eq!(saves, vec![25, 50]);
        assert_eq!(context.stats().stats().snapshots_saved, 4);
    }

    #[test]
    fn test_publish_failure_reaches_observer() {
        let context = context(1, 900);
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let failures = Arc::new(Mutex::new(0usize));
        let seen = failures.clone();
        let t0 = Instant::now();
        let mut scheduler = PublishScheduler::new(context.clone(), Box::new(transport), t0)
            .with_observer(Box::new(move |_batch, result| {
                if result.is_err() {
                    *seen.lock().unwrap() += 1;
                }
            }));

        context.complete_cycle(3);
        scheduler.tick(t0 + Duration::from_secs(1));

        assert_eq!(*failures.lock().unwrap(), 1);
        let stats = context.stats().stats();
        assert_eq!(stats.publish_failures, 1);
        assert_eq!(stats.batches_published, 0);
        // Fire-and-forget: the failed batch is not requeued
        assert!(context.queue().is_empty());
    }

    #[test]
    fn test_shutdown_flushes_and_joins() {
        let context = context(3600, 3600);
        let transport = RecordingTransport::default();
        let scheduler =
            PublishScheduler::new(context.clone(), Box::new(transport.clone()), Instant::now());
        let handle = scheduler.spawn(Duration::from_millis(5)).unwrap();

        context.complete_cycle(8);
        handle.shutdown();

        let batches = transport.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(context.stats().stats().snapshots_saved, 2);
    }
}
