//! Run configuration.
//!
//! Every option can come from a flag or from the environment, resolved once
//! at startup into three plain structs: the run shape ([`HarnessConfig`]),
//! the cache tiers ([`CacheSettings`]) and logging ([`LogSettings`]).

use clap::Parser;
use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use tiered_cache::config::{DirectoryLayerConfig, MemoryLayerConfig};
use tiered_cache::{CacheLayer, DirectoryLayer, MemoryLayer, MultiTierCache};

use crate::error::{HarnessError, Result};
use crate::logging::LogSettings;

/// Default number of logical records
pub const DEFAULT_RECORDS: usize = 1000;
/// Default upper bound of each worker's repeat count
pub const DEFAULT_MAX_REPEATS: usize = 1000;
/// Default ranking length
pub const DEFAULT_TOP_N: usize = 10;
/// Largest accepted worker pool
pub const MAX_WORKERS: usize = 4096;
/// Env file read at startup, relative to the working directory
pub const ENV_FILE: &str = ".env";

/// Load `KEY=value` pairs from `path` into the process environment so the
/// `env` fallbacks of [`Args`] see them. Variables already set win.
///
/// Returns `false` when the file does not exist; a missing file is normal.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(HarnessError::EnvFile(e)),
    }
}

/// Multi-tier cache load-test harness
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of logical records (one writer and one reader each)
    #[arg(long, env = "MAX_RECORDS", default_value_t = DEFAULT_RECORDS)]
    pub records: usize,

    /// Upper bound of the random repeat count per worker
    #[arg(long, env = "MAX_REPEATS", default_value_t = DEFAULT_MAX_REPEATS)]
    pub max_repeats: usize,

    /// Worker pool size. When unset, every worker gets its own thread
    #[arg(long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Number of keys shown in the access ranking
    #[arg(long = "top", env = "TOP_N", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Fixed seed for a reproducible workload
    #[arg(long, env = "SEED")]
    pub seed: Option<u64>,

    /// Capacity of the first (fastest) memory tier
    #[arg(long, env = "MEMORY_CACHE_SIZE", default_value = "100")]
    pub memory_cache_size: usize,

    /// Capacity of the second memory tier
    #[arg(long, env = "SECONDARY_CACHE_SIZE", default_value = "10000")]
    pub secondary_cache_size: usize,

    /// Promotion thresholds, one per memory tier (e.g. "3,1")
    #[arg(long, env = "TIER_THRESHOLDS", value_delimiter = ',')]
    pub thresholds: Option<Vec<u64>>,

    /// Root directory of the persistent backing tier
    #[arg(long, env = "BACKING_DIR", default_value = "cache_backing")]
    pub backing_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,

    /// Export the run summary to this CSV file
    #[arg(long, value_name = "PATH")]
    pub output_csv: Option<PathBuf>,

    /// Export the key ranking to this CSV file
    #[arg(long, value_name = "PATH")]
    pub ranking_csv: Option<PathBuf>,
}

impl Args {
    /// Split the flat argument list into its three concerns
    pub fn into_parts(self) -> (HarnessConfig, CacheSettings, LogSettings) {
        let harness = HarnessConfig {
            records: self.records,
            max_repeats: self.max_repeats,
            workers: self.workers,
            top_n: self.top_n,
            seed: self.seed,
        };
        let cache = CacheSettings {
            memory_cache_size: self.memory_cache_size,
            secondary_cache_size: self.secondary_cache_size,
            thresholds: self.thresholds,
            backing_dir: self.backing_dir,
        };
        let log = LogSettings {
            level: self.log_level,
            json: self.log_json,
        };
        (harness, cache, log)
    }
}

/// Shape of one load-test run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Logical records; each gets one writer and one reader
    pub records: usize,
    /// Upper bound of each worker's repeat count
    pub max_repeats: usize,
    /// Pool size, or `None` for one thread per worker
    pub workers: Option<usize>,
    /// Ranking length
    pub top_n: usize,
    /// Fixed RNG seed, or `None` to seed from entropy
    pub seed: Option<u64>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            records: DEFAULT_RECORDS,
            max_repeats: DEFAULT_MAX_REPEATS,
            workers: None,
            top_n: DEFAULT_TOP_N,
            seed: None,
        }
    }
}

impl HarnessConfig {
    /// Reject settings that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.records == 0 {
            return Err(HarnessError::Config("records must be at least 1".into()));
        }
        if self.records.checked_mul(2).is_none() {
            return Err(HarnessError::Config(format!(
                "records must be at most {}",
                usize::MAX / 2
            )));
        }
        if self.max_repeats == 0 {
            return Err(HarnessError::Config("max repeats must be at least 1".into()));
        }
        match self.workers {
            Some(0) => {
                return Err(HarnessError::Config("worker pool needs at least 1 thread".into()));
            }
            Some(n) if n > MAX_WORKERS => {
                return Err(HarnessError::Config(format!(
                    "worker pool is capped at {MAX_WORKERS} threads, got {n}"
                )));
            }
            _ => {}
        }
        if self.top_n == 0 {
            return Err(HarnessError::Config("ranking length must be at least 1".into()));
        }
        Ok(())
    }
}

/// How to build the cache under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub memory_cache_size: usize,
    pub secondary_cache_size: usize,
    pub thresholds: Option<Vec<u64>>,
    pub backing_dir: PathBuf,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            memory_cache_size: 100,
            secondary_cache_size: 10_000,
            thresholds: None,
            backing_dir: PathBuf::from("cache_backing"),
        }
    }
}

impl CacheSettings {
    /// Bring the tiers up: two memory tiers over a directory tier.
    ///
    /// Any failure here is fatal for the run, so it is reported before a
    /// single worker starts.
    pub fn build(&self) -> Result<MultiTierCache> {
        let l1 = NonZeroUsize::new(self.memory_cache_size)
            .ok_or_else(|| HarnessError::Config("memory cache size must be at least 1".into()))?;
        let l2 = NonZeroUsize::new(self.secondary_cache_size).ok_or_else(|| {
            HarnessError::Config("secondary cache size must be at least 1".into())
        })?;

        let backing = DirectoryLayer::open(DirectoryLayerConfig::new("disk", &self.backing_dir))
            .map_err(HarnessError::Setup)?;

        let layers: Vec<Box<dyn CacheLayer>> = vec![
            Box::new(MemoryLayer::init(MemoryLayerConfig::new("memory", l1))),
            Box::new(MemoryLayer::init(MemoryLayerConfig::new("secondary", l2))),
        ];

        match &self.thresholds {
            Some(thresholds) => {
                MultiTierCache::with_thresholds(layers, Box::new(backing), thresholds.clone())
                    .map_err(HarnessError::Setup)
            }
            None => Ok(MultiTierCache::new(layers, Box::new(backing))),
        }
    }
}
