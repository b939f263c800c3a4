//! Simulated press run.
//!
//! This example shows how to:
//! 1. Build the shared context with a snapshot store
//! 2. Start the publish scheduler on its own thread
//! 3. Drive the poll loop from a scripted status source
//! 4. Shut down cleanly and print the session statistics
//!
//! Run with: cargo run --example simulate

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use press_cycle_agent::{
    agent::AgentContext,
    core::detector::SignalMap,
    core::settings::{Override, Settings},
    io::{IoSourceError, ScriptedSource},
    logging,
    persistence::PersistenceStore,
    poller::Poller,
    publish::{LogTransport, PublishScheduler},
};

const PRESSED: u8 = 0b01;
const POWER_DOWN: u8 = 0b10;

fn main() {
    println!("Press Cycle Agent - Simulation");
    println!("==============================");
    println!();

    let log = logging::init();

    let mut settings = Settings::default();
    for change in [
        Override::WindowSize(5),
        Override::QueueDepth(8),
        Override::TxPeriod(1),
        Override::SavePeriod(2),
        Override::LogLevel(1),
    ] {
        settings.apply(change).expect("demo settings are in range");
    }
    log.apply(&settings);

    let data_dir = std::env::temp_dir().join("press-cycle-simulation");
    let context = Arc::new(AgentContext::restore(
        settings,
        PersistenceStore::new(&data_dir),
    ));
    println!("Snapshots in {data_dir:?}");
    context.log_operating_data();

    let handle = PublishScheduler::new(context.clone(), Box::new(LogTransport), Instant::now())
        .spawn(Duration::from_millis(250))
        .expect("failed to start scheduler");

    // Short presses of varying length at a 10 ms poll, then a power-down.
    let mut script = ScriptedSource::new([0]);
    for i in 0..12 {
        script = script.then(PRESSED, 20 + i * 15).then(0, 10);
    }
    script = script.then(POWER_DOWN, 1).then(0, 50);

    let mut poller = Poller::new(context.clone(), script, SignalMap::default())
        .with_interval(Duration::from_millis(10));
    let running = AtomicBool::new(true);
    match poller.run(&running) {
        Err(IoSourceError::Exhausted) => println!("Script finished"),
        Err(e) => eprintln!("Poll loop failed: {e}"),
        Ok(()) => {}
    }

    handle.shutdown();
    println!();
    println!("{}", context.stats().summary());
}
