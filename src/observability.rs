//! # Observability
//!
//! Provides a simple, configurable interface for initializing tracing and
//! logging for `roundtable`. The scheduler emits structured events
//! (`session_started`, `turn_completed`, `turn_failed`, `session_stopped`)
//! that this subscriber renders; turn failures in particular are
//! diagnostic-only and never surface as hard errors, so the log stream is
//! where they become visible.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Configuration for initializing the observability system.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// The maximum log level to capture.
    pub level: Level,
    /// The target for the logs.
    pub target: LogTarget,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            target: LogTarget::default(),
        }
    }
}

/// Defines the output target for logs.
#[derive(Debug, Clone, Default)]
pub enum LogTarget {
    /// Log to the console (stdout).
    #[default]
    Console,
    /// Log to a file.
    File(String),
}

/// Initializes the global tracing subscriber.
///
/// Call once at the beginning of the application's main function.
///
/// # Errors
///
/// Fails if the filter directive cannot be parsed or the log file cannot be
/// created. Setting a second global subscriber panics, as with any tracing
/// setup.
pub fn init(config: ObservabilityConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("roundtable={}", config.level).parse()?);

    let subscriber = tracing_subscriber::registry().with(filter);

    match config.target {
        LogTarget::Console => {
            let layer = fmt::layer().with_writer(std::io::stdout);
            subscriber.with(layer).init();
        }
        LogTarget::File(path) => {
            let file = std::sync::Arc::new(std::fs::File::create(path)?);
            let layer = fmt::layer().with_writer(file);
            subscriber.with(layer).init();
        }
    };

    Ok(())
}
