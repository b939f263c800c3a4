//! Press Cycle Agent CLI
//!
//! Times mold-press cycles from the controller status byte and publishes
//! cycle records off the device.

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use press_cycle_agent::{
    agent::{self, AgentContext},
    config::Config,
    core::settings::Override,
    io::FileSource,
    logging::{self, LogHandle},
    persistence::PersistenceStore,
    poller::Poller,
    publish::{build_transport, PublishScheduler},
    Settings, VERSION,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "press-cycle")]
#[command(version = VERSION)]
#[command(about = "Mold-press cycle timing and telemetry agent", long_about = None)]
#[command(after_help = "Note: the queue depth (-q) should be sized for the transmit period (-p).")]
struct Cli {
    /// Averaging window size, default:100, max:100
    #[arg(short = 'w', value_name = "N")]
    window: Option<u32>,

    /// Record queue size, default:20, max:20
    #[arg(short = 'q', value_name = "N")]
    queue: Option<u32>,

    /// Record transmit period (sec), default:60
    #[arg(short = 'p', value_name = "SECS")]
    tx_period: Option<u32>,

    /// Record save-to-storage period (sec), default:900
    #[arg(short = 's', value_name = "SECS")]
    save_period: Option<u32>,

    /// Log level from 0 (lowest) to 3 (highest), default:0
    #[arg(short = 'd', value_name = "LEVEL")]
    log_level: Option<u32>,

    /// Deployment config file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    fn overrides(&self) -> Vec<Override> {
        [
            self.window.map(Override::WindowSize),
            self.queue.map(Override::QueueDepth),
            self.tx_period.map(Override::TxPeriod),
            self.save_period.map(Override::SavePeriod),
            self.log_level.map(Override::LogLevel),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the controller and publish cycle records (default)
    Run,

    /// Show persisted settings, last record and window values
    Status,

    /// Show deployment configuration
    Config,
}

/// Printed after a command line that could not be parsed.
const USAGE_HINT: &str = "unknown option, try -h for help";

/// Write the parse message to `out` and return the exit code.
///
/// Help, version and bad flags all end the process successfully.
fn report_parse_error(e: &clap::Error, out: &mut impl Write) -> i32 {
    let _ = write!(out, "{}", e.render());
    if !matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
        let _ = writeln!(out, "{USAGE_HINT}");
    }
    0
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = report_parse_error(&e, &mut std::io::stdout());
            std::process::exit(code);
        }
    };

    let log = logging::init();

    if let Err(e) = run(cli, &log) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, log: &LogHandle) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);
    let config = Config::load_from(&config_path).unwrap_or_else(|e| {
        tracing::warn!("Could not load {config_path:?}, using defaults: {e}");
        Config::default()
    });
    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create data directory: {e}");
    }

    let store = PersistenceStore::new(&config.data_dir);
    let mut settings = agent::load_settings(&store);
    agent::apply_overrides(&mut settings, &cli.overrides(), &store);
    log.apply(&settings);

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(&config, settings, store),
        Commands::Status => {
            cmd_status(settings, store);
            Ok(())
        }
        Commands::Config => {
            cmd_config(&config, &config_path);
            Ok(())
        }
    }
}

fn cmd_run(config: &Config, settings: Settings, store: PersistenceStore) -> anyhow::Result<()> {
    tracing::info!("Press Cycle Agent v{VERSION}");

    let context = Arc::new(AgentContext::restore(settings, store));
    tracing::info!("Power-up settings");
    context.log_operating_data();

    let scheduler = PublishScheduler::new(
        context.clone(),
        build_transport(&config.transport),
        Instant::now(),
    );
    let handle = scheduler
        .spawn(config.scheduler_tick())
        .context("starting publish scheduler")?;

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    let source = FileSource::new(&config.io.status_path);
    let mut poller = Poller::new(context.clone(), source, config.io.signals())
        .with_interval(config.io.poll_interval());
    let result = poller.run(&running);

    tracing::info!("Stopping...");
    handle.shutdown();
    println!("{}", context.stats().summary());

    result.with_context(|| format!("reading status from {:?}", config.io.status_path))
}

fn cmd_status(settings: Settings, store: PersistenceStore) {
    println!("Press Cycle Agent Status");
    println!("========================");
    println!();
    println!("Snapshot directory: {:?}", store.dir());
    println!();

    let context = AgentContext::restore(settings, store);
    println!("{}", context.operating_data());
}

fn cmd_config(config: &Config, path: &std::path::Path) {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {path:?}");
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(config).unwrap_or_else(|_| "Error".to_string())
    );
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> anyhow::Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("setting Ctrl+C handler")
}
