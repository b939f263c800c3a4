//! Log output setup.
//!
//! The subscriber is installed before the settings are known, so the filter
//! sits behind a reload handle and is tightened or loosened once the
//! persisted log level has been read. `RUST_LOG` takes precedence when set.

use crate::core::settings::Settings;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

/// Install the global subscriber.
pub fn init() -> LogHandle {
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("warn")));

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
        .is_err()
    {
        eprintln!("Note: a log subscriber is already installed");
    }

    LogHandle {
        filter: handle,
        from_env,
    }
}

impl LogHandle {
    /// Switch verbosity to the level in `settings`.
    pub fn apply(&self, settings: &Settings) {
        if self.from_env {
            return;
        }
        if let Err(e) = self
            .filter
            .reload(EnvFilter::new(settings.log_directive()))
        {
            eprintln!("Warning: could not change log level: {e}");
        }
    }
}
