//! Drives one load-test run.
//!
//! The runner plans every job up front on the calling thread, then launches
//! them either one thread per job (fan-out) or on a fixed pool fed through a
//! channel. Both modes live inside [`std::thread::scope`], whose end is the
//! join barrier: the statistics are only taken out of the accumulator after
//! every worker has returned.

use crossbeam::channel;
use std::thread;
use std::time::{Duration, Instant};

use tiered_cache::Cache;
use tracing::{dispatcher, info, warn, Dispatch};

use crate::config::HarnessConfig;
use crate::generator::WorkloadGenerator;
use crate::models::WorkerKind;
use crate::stats::{RunStats, StatsAccumulator};
use crate::worker::Job;

/// Frozen outcome of a run
#[derive(Debug)]
pub struct RunResult {
    /// Final statistics, read after the join barrier
    pub stats: RunStats,
    /// When the first worker was launched; ranking offsets are relative to it
    pub started_at: Instant,
    /// Wall-clock time from launch to barrier
    pub elapsed: Duration,
}

/// Runner for load tests
pub struct LoadTestRunner {
    config: HarnessConfig,
    dispatch: Dispatch,
}

impl LoadTestRunner {
    /// Create a runner. Every worker thread logs through `dispatch`.
    pub fn new(config: HarnessConfig, dispatch: Dispatch) -> Self {
        Self { config, dispatch }
    }

    /// The configuration this runner was built with
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Build the job list: a writer then a reader per record, each with its
    /// own repeat count. A fixed seed yields the same list every time.
    pub fn plan(&self) -> Vec<Job> {
        let mut generator = match self.config.seed {
            Some(seed) => WorkloadGenerator::from_seed(seed),
            None => WorkloadGenerator::from_entropy(),
        };

        let mut jobs = Vec::with_capacity(self.config.records.saturating_mul(2));
        for _ in 0..self.config.records {
            let record = generator.next_record();
            let write_repeats = generator.next_repeat_count(self.config.max_repeats);
            let read_repeats = generator.next_repeat_count(self.config.max_repeats);

            jobs.push(Job {
                kind: WorkerKind::Writer,
                record: record.clone(),
                repeats: write_repeats,
            });
            jobs.push(Job {
                kind: WorkerKind::Reader,
                record,
                repeats: read_repeats,
            });
        }
        jobs
    }

    /// Run the whole workload against `cache` and wait for every worker.
    pub fn run<C: Cache + ?Sized>(&self, cache: &C) -> RunResult {
        dispatcher::with_default(&self.dispatch, || {
            let jobs = self.plan();
            let stats = StatsAccumulator::new();

            info!(
                records = self.config.records,
                jobs = jobs.len(),
                workers = ?self.config.workers,
                "starting load test"
            );

            let started_at = Instant::now();
            match self.config.workers {
                Some(pool_size) => self.run_pool(cache, &jobs, &stats, pool_size),
                None => self.run_fan_out(cache, &jobs, &stats),
            }
            let elapsed = started_at.elapsed();

            let stats = stats.into_inner();
            info!(
                ?elapsed,
                writers = stats.writers_completed,
                readers = stats.readers_completed,
                "all workers finished"
            );

            RunResult {
                stats,
                started_at,
                elapsed,
            }
        })
    }

    /// One thread per job. A job whose thread cannot be spawned runs on the
    /// calling thread instead, so no record is silently dropped.
    fn run_fan_out<C: Cache + ?Sized>(&self, cache: &C, jobs: &[Job], stats: &StatsAccumulator) {
        thread::scope(|s| {
            for (i, job) in jobs.iter().enumerate() {
                let dispatch = &self.dispatch;
                let spawned = thread::Builder::new()
                    .name(format!("{}-{}", job.kind, i / 2))
                    .spawn_scoped(s, move || {
                        dispatcher::with_default(dispatch, || job.execute(cache, stats))
                    });

                if let Err(e) = spawned {
                    warn!(key = %job.record.key, kind = %job.kind, error = %e, "spawn failed, running inline");
                    job.execute(cache, stats);
                }
            }
        });
    }

    /// `pool_size` threads pulling jobs from a bounded channel. Jobs are
    /// queued in plan order, so a record's writer and reader still race.
    fn run_pool<C: Cache + ?Sized>(
        &self,
        cache: &C,
        jobs: &[Job],
        stats: &StatsAccumulator,
        pool_size: usize,
    ) {
        let (tx, rx) = channel::bounded::<&Job>(pool_size.max(1).saturating_mul(2));

        thread::scope(|s| {
            let mut spawned = 0;
            for i in 0..pool_size {
                let rx = rx.clone();
                let dispatch = &self.dispatch;
                let result = thread::Builder::new()
                    .name(format!("pool-{i}"))
                    .spawn_scoped(s, move || {
                        dispatcher::with_default(dispatch, || {
                            for job in rx.iter() {
                                job.execute(cache, stats);
                            }
                        })
                    });

                match result {
                    Ok(_) => spawned += 1,
                    Err(e) => warn!(worker = i, error = %e, "failed to spawn pool thread"),
                }
            }
            drop(rx);

            if spawned == 0 {
                warn!("no pool threads available, running every job inline");
                for job in jobs {
                    job.execute(cache, stats);
                }
                return;
            }

            for job in jobs {
                if tx.send(job).is_err() {
                    // every pool thread is gone; finish here
                    job.execute(cache, stats);
                }
            }
            drop(tx);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use tiered_cache::config::MemoryLayerConfig;
    use tiered_cache::{CacheError, CacheLayer, MemoryLayer, MultiTierCache};

    fn memory_cache() -> MultiTierCache {
        let layers: Vec<Box<dyn CacheLayer>> = vec![Box::new(MemoryLayer::init(
            MemoryLayerConfig::new("l1", NonZeroUsize::new(64).unwrap()),
        ))];
        let backing = MemoryLayer::init(MemoryLayerConfig::new(
            "backing",
            NonZeroUsize::new(10_000).unwrap(),
        ));
        MultiTierCache::new(layers, Box::new(backing))
    }

    fn runner(config: HarnessConfig) -> LoadTestRunner {
        LoadTestRunner::new(config, Dispatch::none())
    }

    struct BrokenCache;

    impl Cache for BrokenCache {
        fn set(&self, _key: &str, _value: &str) -> tiered_cache::Result<()> {
            Err(CacheError::Unavailable {
                tier: "broken".into(),
                reason: "always down".into(),
            })
        }

        fn get(&self, _key: &str) -> tiered_cache::Result<Option<String>> {
            Err(CacheError::Unavailable {
                tier: "broken".into(),
                reason: "always down".into(),
            })
        }
    }

    #[test]
    fn test_plan_is_reproducible_with_seed() {
        let config = HarnessConfig {
            records: 20,
            max_repeats: 50,
            seed: Some(11),
            ..Default::default()
        };
        let a = runner(config.clone()).plan();
        let b = runner(config).plan();

        assert_eq!(a.len(), 40);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.kind, y.kind);
            assert_eq!(x.record, y.record);
            assert_eq!(x.repeats, y.repeats);
        }
        for pair in a.chunks(2) {
            assert_eq!(pair[0].kind, WorkerKind::Writer);
            assert_eq!(pair[1].kind, WorkerKind::Reader);
            assert_eq!(pair[0].record, pair[1].record);
        }
    }

    #[test]
    fn test_runner_keeps_its_config() {
        let config = HarnessConfig {
            records: 3,
            top_n: 2,
            ..Default::default()
        };
        assert_eq!(runner(config.clone()).config(), &config);
    }

    #[test]
    fn test_five_records_single_repeat() {
        let result = runner(HarnessConfig {
            records: 5,
            max_repeats: 1,
            ..Default::default()
        })
        .run(&memory_cache());

        let stats = result.stats;
        assert_eq!(stats.writers_completed, 5);
        assert_eq!(stats.readers_completed, 5);
        assert_eq!(stats.writer_iterations, 5);
        assert_eq!(stats.reader_iterations, 5);
        assert!(stats.set_count <= 5);
        assert_eq!(stats.mismatch_count, 0);
        assert_eq!(stats.get_count + stats.miss_count, stats.reader_iterations);
    }

    #[test]
    fn test_pool_and_fan_out_agree_on_iterations() {
        let base = HarnessConfig {
            records: 30,
            max_repeats: 20,
            seed: Some(5),
            ..Default::default()
        };
        let expected: usize = runner(base.clone())
            .plan()
            .iter()
            .filter(|job| job.kind == WorkerKind::Reader)
            .map(|job| job.repeats)
            .sum();

        let fan_out = runner(base.clone()).run(&memory_cache()).stats;
        let pooled = runner(HarnessConfig {
            workers: Some(4),
            ..base
        })
        .run(&memory_cache())
        .stats;

        assert_eq!(fan_out.reader_iterations, expected as u64);
        assert_eq!(fan_out.reader_iterations, pooled.reader_iterations);
        assert_eq!(fan_out.writer_iterations, pooled.writer_iterations);
        assert_eq!(fan_out.set_count, pooled.set_count);
        assert_eq!(fan_out.total_repeats, pooled.total_repeats);
        assert_eq!(pooled.mismatch_count, 0);
    }

    #[test]
    fn test_single_thread_pool() {
        let stats = runner(HarnessConfig {
            records: 10,
            max_repeats: 3,
            workers: Some(1),
            seed: Some(1),
            ..Default::default()
        })
        .run(&memory_cache())
        .stats;

        // one thread runs the writer before its reader
        assert_eq!(stats.miss_count, 0);
        assert_eq!(stats.get_count, stats.reader_iterations);
        assert_eq!(stats.writers_completed, 10);
        assert_eq!(stats.readers_completed, 10);
    }

    #[test]
    fn test_always_failing_cache() {
        let stats = runner(HarnessConfig {
            records: 8,
            max_repeats: 4,
            ..Default::default()
        })
        .run(&BrokenCache)
        .stats;

        assert_eq!(stats.set_count, 0);
        assert_eq!(stats.get_count, 0);
        assert_eq!(stats.set_failures, stats.writer_iterations);
        assert_eq!(stats.miss_count, stats.reader_iterations);
        assert!(stats.access_counts.is_empty());
    }
}
