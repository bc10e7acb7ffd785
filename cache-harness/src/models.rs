// Data models for the load-test harness

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tiered_cache::CacheError;

/// One logical unit of work: a key and the value written under it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// Cache key
    pub key: String,
    /// Value the writer stores and the reader expects back
    pub value: String,
}

impl Record {
    /// Create a new record
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// What a single cache read produced
#[derive(Debug)]
pub enum ReadOutcome {
    /// A non-empty value came back
    Hit(String),
    /// Nothing was stored (or the stored value was empty)
    Miss,
    /// The cache reported an error
    Failed(CacheError),
}

impl ReadOutcome {
    /// Classify a raw `Cache::get` result. Empty values count as misses.
    pub fn from_result(result: tiered_cache::Result<Option<String>>) -> Self {
        match result {
            Ok(Some(value)) if !value.is_empty() => ReadOutcome::Hit(value),
            Ok(_) => ReadOutcome::Miss,
            Err(e) => ReadOutcome::Failed(e),
        }
    }
}

/// How the accumulator classified one read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadVerdict {
    /// Value matched the expected one
    Hit,
    /// Miss or failed read
    Miss,
    /// Value came back but differs from what was written
    Mismatch,
}

/// Which side of a record a worker drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkerKind {
    Writer,
    Reader,
}

impl WorkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerKind::Writer => "writer",
            WorkerKind::Reader => "reader",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One key's position in the popularity ranking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedKey {
    /// Cache key
    pub key: String,
    /// Successful writes plus matching reads
    pub access_count: u64,
    /// First matching read, relative to run start (zero if never read)
    pub first_access: Duration,
    /// Most recent matching read, relative to run start (zero if never read)
    pub last_access: Duration,
}

/// Everything the report prints, computed once after the join barrier
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub set_count: u64,
    pub get_count: u64,
    pub miss_count: u64,
    pub mismatch_count: u64,
    pub set_failures: u64,
    pub total_records: u64,
    pub total_repeats: u64,
    pub writer_iterations: u64,
    pub reader_iterations: u64,
    pub avg_set_duration: Duration,
    pub avg_get_duration: Duration,
    /// Successful writes per second of wall-clock run time
    pub throughput_set: f64,
    /// Successful reads per second of wall-clock run time
    pub throughput_get: f64,
    /// Misses as a percentage of successful reads
    pub miss_rate: f64,
    pub elapsed: Duration,
    pub distinct_keys: usize,
    pub ranking: Vec<RankedKey>,
    /// Metrics reported by the cache itself, if supplied
    pub cache_metrics: BTreeMap<String, f64>,
}

/// Narrow a `Duration` unit count to `u64`, clamping on overflow
pub fn saturating_u64(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// CSV export row for the run summary
#[derive(Debug, Serialize)]
pub struct SummaryCsvRow {
    pub set_count: u64,
    pub get_count: u64,
    pub miss_count: u64,
    pub mismatch_count: u64,
    pub set_failures: u64,
    pub total_records: u64,
    pub total_repeats: u64,
    pub avg_set_ns: u64,
    pub avg_get_ns: u64,
    pub throughput_set: f64,
    pub throughput_get: f64,
    pub miss_rate: f64,
    pub elapsed_ms: u64,
    pub distinct_keys: usize,
}

impl From<&RunSummary> for SummaryCsvRow {
    fn from(summary: &RunSummary) -> Self {
        Self {
            set_count: summary.set_count,
            get_count: summary.get_count,
            miss_count: summary.miss_count,
            mismatch_count: summary.mismatch_count,
            set_failures: summary.set_failures,
            total_records: summary.total_records,
            total_repeats: summary.total_repeats,
            avg_set_ns: saturating_u64(summary.avg_set_duration.as_nanos()),
            avg_get_ns: saturating_u64(summary.avg_get_duration.as_nanos()),
            throughput_set: summary.throughput_set,
            throughput_get: summary.throughput_get,
            miss_rate: summary.miss_rate,
            elapsed_ms: saturating_u64(summary.elapsed.as_millis()),
            distinct_keys: summary.distinct_keys,
        }
    }
}

/// CSV export row for one ranked key
#[derive(Debug, Serialize)]
pub struct RankingCsvRow {
    pub rank: usize,
    pub key: String,
    pub access_count: u64,
    pub first_access_ms: u64,
    pub last_access_ms: u64,
}

impl RankingCsvRow {
    pub fn new(rank: usize, entry: &RankedKey) -> Self {
        Self {
            rank,
            key: entry.key.clone(),
            access_count: entry.access_count,
            first_access_ms: saturating_u64(entry.first_access.as_millis()),
            last_access_ms: saturating_u64(entry.last_access.as_millis()),
        }
    }
}
