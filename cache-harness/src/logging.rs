//! Structured logging setup.
//!
//! Builds a [`Dispatch`] instead of installing a process-wide subscriber.
//! The binary enters it on the main thread and the runner enters it on
//! every worker thread, so nothing depends on a global logger.

use tracing::{Dispatch, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Logging options resolved from the command line / environment
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// trace, debug, info, warn or error; anything else means info
    pub level: String,
    /// Emit JSON lines instead of human readable text
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Map a level name to a tracing level, defaulting to INFO.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Build the dispatcher the whole run logs through.
///
/// Log lines go to stderr so the textual summary on stdout stays clean.
pub fn build_dispatch(settings: &LogSettings) -> Dispatch {
    let filter = EnvFilter::from_default_env().add_directive(parse_level(&settings.level).into());

    if settings.json {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr)),
        )
    } else {
        Dispatch::new(
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr)),
        )
    }
}
