//! Writer and reader workers.
//!
//! Each logical record gets one writer and one reader, launched together
//! with no ordering between them. A reader that gets ahead of its writer
//! sees misses; that is part of the measured workload, not a failure.

use std::time::Instant;

use tiered_cache::Cache;
use tracing::{debug, error, warn};

use crate::models::{ReadOutcome, ReadVerdict, Record, WorkerKind};
use crate::stats::StatsAccumulator;

/// A unit of work for one worker thread
#[derive(Debug, Clone)]
pub struct Job {
    /// Writer or reader
    pub kind: WorkerKind,
    /// The record this worker drives
    pub record: Record,
    /// How many times the operation is repeated
    pub repeats: usize,
}

impl Job {
    /// Run the job to completion against `cache`
    pub fn execute<C: Cache + ?Sized>(&self, cache: &C, stats: &StatsAccumulator) {
        match self.kind {
            WorkerKind::Writer => run_writer(cache, &self.record, stats, self.repeats),
            WorkerKind::Reader => {
                run_reader(cache, &self.record.key, &self.record.value, stats, self.repeats)
            }
        }
    }
}

/// Write `record` `repeats` times, timing each write.
///
/// A failed write is logged and skipped; the worker carries on with the
/// next iteration.
pub fn run_writer<C: Cache + ?Sized>(
    cache: &C,
    record: &Record,
    stats: &StatsAccumulator,
    repeats: usize,
) {
    for j in 0..repeats {
        let start = Instant::now();
        let result = cache.set(&record.key, &record.value);
        let duration = start.elapsed();

        match result {
            Ok(()) => {
                stats.record_set(&record.key, &record.value, duration, repeats);
                debug!(key = %record.key, ?duration, repeat = j + 1, "set");
            }
            Err(e) => {
                stats.record_set_failure();
                warn!(key = %record.key, repeat = j + 1, error = %e, "failed to set key");
            }
        }
    }
    stats.record_writer_done();
}

/// Read `key` `repeats` times, timing each read and checking the value
/// against `expected`.
pub fn run_reader<C: Cache + ?Sized>(
    cache: &C,
    key: &str,
    expected: &str,
    stats: &StatsAccumulator,
    repeats: usize,
) {
    for j in 0..repeats {
        let start = Instant::now();
        let outcome = ReadOutcome::from_result(cache.get(key));
        let duration = start.elapsed();

        match stats.record_get(key, expected, &outcome, duration) {
            ReadVerdict::Hit => {
                debug!(key, ?duration, repeat = j + 1, "get");
            }
            ReadVerdict::Miss => match &outcome {
                ReadOutcome::Failed(e) => {
                    warn!(key, repeat = j + 1, error = %e, "failed to get key");
                }
                _ => debug!(key, repeat = j + 1, "miss (not found)"),
            },
            ReadVerdict::Mismatch => {
                let got = match &outcome {
                    ReadOutcome::Hit(value) => value.as_str(),
                    _ => "",
                };
                error!(key, expected, got, repeat = j + 1, "value mismatch");
            }
        }
    }
    stats.record_reader_done();
}
