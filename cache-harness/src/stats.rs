// Statistics accumulation for a load-test run

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::{ReadOutcome, ReadVerdict};

/// Plain aggregate of everything the workers observed.
///
/// Only reachable through [`StatsAccumulator`] while workers run; handed out
/// by value once they have all been joined.
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    /// Successful writes
    pub set_count: u64,
    /// Reads that returned a value (matching or not)
    pub get_count: u64,
    /// Reads that found nothing or failed
    pub miss_count: u64,
    /// Reads that returned a value other than the one written
    pub mismatch_count: u64,
    /// Writes the cache rejected
    pub set_failures: u64,
    /// Successful writes, counted as records
    pub total_records: u64,
    /// Sum of the writer's full repeat count over every successful write
    pub total_repeats: u64,
    /// Write attempts
    pub writer_iterations: u64,
    /// Read attempts
    pub reader_iterations: u64,
    /// Writer workers that ran to completion
    pub writers_completed: u64,
    /// Reader workers that ran to completion
    pub readers_completed: u64,
    /// Time spent in successful writes
    pub total_set_duration: Duration,
    /// Time spent in successful reads
    pub total_get_duration: Duration,
    /// Last value written per key
    pub stored_keys: HashMap<String, String>,
    /// Successful writes plus matching reads per key
    pub access_counts: HashMap<String, u64>,
    /// First matching read per key
    pub first_access: HashMap<String, Instant>,
    /// Most recent matching read per key
    pub last_access: HashMap<String, Instant>,
}

/// The run-wide accumulator shared by every worker.
///
/// One lock guards the whole aggregate. Critical sections are a handful of
/// counter bumps and map updates, never a cache call.
#[derive(Debug, Default)]
pub struct StatsAccumulator {
    inner: Mutex<RunStats>,
}

impl StatsAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful write of `value` under `key` by a writer that
    /// repeats `repeats` times
    pub fn record_set(&self, key: &str, value: &str, elapsed: Duration, repeats: usize) {
        let mut stats = self.inner.lock();
        stats.writer_iterations += 1;
        stats.set_count += 1;
        stats.total_set_duration += elapsed;
        stats.stored_keys.insert(key.to_owned(), value.to_owned());
        stats.total_records += 1;
        stats.total_repeats += repeats as u64;
        *stats.access_counts.entry(key.to_owned()).or_insert(0) += 1;
    }

    /// Record a write the cache rejected
    pub fn record_set_failure(&self) {
        let mut stats = self.inner.lock();
        stats.writer_iterations += 1;
        stats.set_failures += 1;
    }

    /// Record one read of `key` and classify it against `expected`
    pub fn record_get(
        &self,
        key: &str,
        expected: &str,
        outcome: &ReadOutcome,
        elapsed: Duration,
    ) -> ReadVerdict {
        let mut stats = self.inner.lock();
        stats.reader_iterations += 1;

        let value = match outcome {
            ReadOutcome::Hit(value) => value,
            ReadOutcome::Miss | ReadOutcome::Failed(_) => {
                stats.miss_count += 1;
                return ReadVerdict::Miss;
            }
        };

        stats.get_count += 1;
        stats.total_get_duration += elapsed;

        if value != expected {
            stats.mismatch_count += 1;
            return ReadVerdict::Mismatch;
        }

        let now = Instant::now();
        stats.first_access.entry(key.to_owned()).or_insert(now);
        stats.last_access.insert(key.to_owned(), now);
        *stats.access_counts.entry(key.to_owned()).or_insert(0) += 1;
        ReadVerdict::Hit
    }

    /// Mark a writer as finished
    pub fn record_writer_done(&self) {
        self.inner.lock().writers_completed += 1;
    }

    /// Mark a reader as finished
    pub fn record_reader_done(&self) {
        self.inner.lock().readers_completed += 1;
    }

    /// Freeze the accumulator. Consuming `self` means no worker can still
    /// hold a reference, so the returned state is final.
    pub fn into_inner(self) -> RunStats {
        self.inner.into_inner()
    }
}
