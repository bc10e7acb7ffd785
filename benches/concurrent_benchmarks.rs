//! Concurrent Cache Benchmarks
//!
//! Measures the multi-tier cache under parallel readers and writers with
//! different segment counts in the memory tiers.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::num::NonZeroUsize;
use std::thread;
use tiered_cache::config::MemoryLayerConfig;
use tiered_cache::{Cache, CacheLayer, MemoryLayer, MultiTierCache};

const CACHE_SIZE: usize = 10_000;
const OPS_PER_THREAD: usize = 1_000;
const THREADS: usize = 8;

fn make_cache(segments: usize) -> MultiTierCache {
    let memory = |name: &str, cap: usize| -> Box<dyn CacheLayer> {
        Box::new(MemoryLayer::init(
            MemoryLayerConfig::new(name, NonZeroUsize::new(cap).unwrap()).with_segments(segments),
        ))
    };
    MultiTierCache::new(
        vec![memory("l1", CACHE_SIZE / 10), memory("l2", CACHE_SIZE)],
        memory("backing", CACHE_SIZE * 10),
    )
}

fn run_mixed(cache: &MultiTierCache, threads: usize, ops: usize) {
    thread::scope(|s| {
        for t in 0..threads {
            s.spawn(move || {
                for i in 0..ops {
                    let key = format!("key{}", (t * ops + i) % CACHE_SIZE);
                    if i % 4 == 0 {
                        let _ = cache.set(&key, "value");
                    } else {
                        let _ = cache.get(&key);
                    }
                }
            });
        }
    });
}

/// Mixed 25% write / 75% read load across segment counts
fn concurrent_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("Concurrent Mixed");
    group.throughput(Throughput::Elements((THREADS * OPS_PER_THREAD) as u64));

    for segments in [1, 4, 16, 64] {
        let cache = make_cache(segments);
        for i in 0..CACHE_SIZE {
            cache.set(&format!("key{i}"), "value").unwrap();
        }

        group.bench_with_input(BenchmarkId::new("segments", segments), &cache, |b, cache| {
            b.iter(|| run_mixed(cache, THREADS, OPS_PER_THREAD));
        });
    }

    group.finish();
}

criterion_group!(benches, concurrent_mixed);
criterion_main!(benches);
