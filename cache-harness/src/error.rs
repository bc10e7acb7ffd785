//! Error types for the load-test harness

use thiserror::Error;
use tiered_cache::CacheError;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that stop the harness. Per-operation cache failures never end up
/// here; workers count and log those.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Configuration rejected before the run started
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A cache tier could not be brought up
    #[error("Cache setup failed: {0}")]
    Setup(#[source] CacheError),

    /// The env file exists but could not be read or parsed
    #[error("Env file error: {0}")]
    EnvFile(#[source] dotenvy::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV export error
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}
