//! Error types for cache tiers

use thiserror::Error;

/// Result type alias using [`CacheError`]
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors a cache tier or the multi-tier cache can report
#[derive(Error, Debug)]
pub enum CacheError {
    /// I/O error from a persistent tier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid tier or cache configuration
    #[error("Invalid cache configuration: {0}")]
    Config(String),

    /// A tier refused or could not serve the operation
    #[error("Cache tier '{tier}' is unavailable: {reason}")]
    Unavailable {
        /// Name of the tier that failed
        tier: String,
        /// Human readable cause
        reason: String,
    },
}
