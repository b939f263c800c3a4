//! The high-frequency poll loop.
//!
//! Reads one status byte per tick, runs it through the cycle detector and
//! applies the resulting transitions to the shared context.

use crate::agent::SharedContext;
use crate::core::detector::{CycleEventDetector, SignalMap, Transitions};
use crate::io::{IoSource, IoSourceError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Default poll period.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

pub struct Poller<S: IoSource> {
    context: SharedContext,
    detector: CycleEventDetector,
    source: S,
    interval: Duration,
}

impl<S: IoSource> Poller<S> {
    pub fn new(context: SharedContext, source: S, signals: SignalMap) -> Self {
        Self {
            context,
            detector: CycleEventDetector::new(signals),
            source,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Apply one status byte observed at `now`.
    pub fn process(&mut self, status: u8, now: Instant) -> Transitions {
        tracing::trace!("IO data={status:#04x}");
        let transitions = self.detector.observe(status, now);

        if transitions.cycle_started {
            tracing::trace!("Key pressed");
        }
        if let Some(duration) = transitions.cycle_completed {
            tracing::trace!("Key released");
            self.context.complete_cycle(duration);
        }
        if transitions.power_down {
            self.context.handle_power_down();
        }

        transitions
    }

    /// Read the source once and apply the result.
    pub fn poll_once(&mut self, now: Instant) -> Result<Transitions, IoSourceError> {
        let status = self.source.read_status()?;
        Ok(self.process(status, now))
    }

    /// Poll until `running` is cleared or the source fails.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), IoSourceError> {
        while running.load(Ordering::SeqCst) {
            thread::sleep(self.interval);
            self.poll_once(Instant::now())?;
        }
        Ok(())
    }
}
