// Post-run reporting: derived figures, the key ranking, text and CSV output

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::models::{saturating_u64, RankedKey, RankingCsvRow, RunSummary, SummaryCsvRow};
use crate::runner::RunResult;
use crate::stats::RunStats;

/// `total / count`, or zero when nothing was counted
pub fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(saturating_u64(total.as_nanos() / u128::from(count)))
}

/// Operations per second of wall-clock time, or zero for an empty interval
pub fn throughput(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    count as f64 / secs
}

/// Misses as a percentage of successful gets, or zero when there were none
pub fn miss_rate(miss_count: u64, get_count: u64) -> f64 {
    if get_count == 0 {
        return 0.0;
    }
    miss_count as f64 / get_count as f64 * 100.0
}

/// The `top_n` most accessed keys, most accessed first.
///
/// Equal counts are ordered by key. Offsets are measured from `started_at`;
/// a key that was only ever written reports zero for both.
pub fn ranked_keys(stats: &RunStats, started_at: Instant, top_n: usize) -> Vec<RankedKey> {
    let offset = |at: Option<&Instant>| {
        at.map(|at| at.saturating_duration_since(started_at))
            .unwrap_or_default()
    };

    let mut ranking: Vec<RankedKey> = stats
        .access_counts
        .iter()
        .map(|(key, &count)| RankedKey {
            key: key.clone(),
            access_count: count,
            first_access: offset(stats.first_access.get(key)),
            last_access: offset(stats.last_access.get(key)),
        })
        .collect();

    ranking.sort_by(|a, b| {
        Reverse(a.access_count)
            .cmp(&Reverse(b.access_count))
            .then_with(|| a.key.cmp(&b.key))
    });
    ranking.truncate(top_n.min(ranking.len()));
    ranking
}

/// Derive every reported figure from a finished run
pub fn summarize(run: &RunResult, top_n: usize) -> RunSummary {
    let stats = &run.stats;
    RunSummary {
        set_count: stats.set_count,
        get_count: stats.get_count,
        miss_count: stats.miss_count,
        mismatch_count: stats.mismatch_count,
        set_failures: stats.set_failures,
        total_records: stats.total_records,
        total_repeats: stats.total_repeats,
        writer_iterations: stats.writer_iterations,
        reader_iterations: stats.reader_iterations,
        avg_set_duration: average(stats.total_set_duration, stats.set_count),
        avg_get_duration: average(stats.total_get_duration, stats.get_count),
        throughput_set: throughput(stats.set_count, run.elapsed),
        throughput_get: throughput(stats.get_count, run.elapsed),
        miss_rate: miss_rate(stats.miss_count, stats.get_count),
        elapsed: run.elapsed,
        distinct_keys: stats.access_counts.len(),
        ranking: ranked_keys(stats, run.started_at, top_n),
        cache_metrics: BTreeMap::new(),
    }
}

impl RunSummary {
    /// Attach the cache's own counters to the report
    pub fn with_cache_metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.cache_metrics = metrics;
        self
    }
}

/// Render the textual report
pub fn write_summary<W: Write>(summary: &RunSummary, out: &mut W) -> io::Result<()> {
    writeln!(out, "\n===== TEST PERFORMANCE SUMMARY =====")?;
    writeln!(out, "Total SET operations: {}", summary.set_count)?;
    writeln!(out, "Total GET operations: {}", summary.get_count)?;
    writeln!(out, "Total MISS count: {}", summary.miss_count)?;
    writeln!(out, "Total value mismatches: {}", summary.mismatch_count)?;
    writeln!(out, "Total SET failures: {}", summary.set_failures)?;
    writeln!(out, "Total records written: {}", summary.total_records)?;
    writeln!(out, "Total repeats performed: {}", summary.total_repeats)?;
    writeln!(out, "Average SET duration: {:?}", summary.avg_set_duration)?;
    writeln!(out, "Average GET duration: {:?}", summary.avg_get_duration)?;
    writeln!(out, "Throughput SET: {:.2} ops/sec", summary.throughput_set)?;
    writeln!(out, "Throughput GET: {:.2} ops/sec", summary.throughput_get)?;
    writeln!(out, "Miss rate: {:.2}%", summary.miss_rate)?;
    writeln!(out, "Elapsed: {:.2?}", summary.elapsed)?;
    writeln!(out, "Distinct keys: {}", summary.distinct_keys)?;

    writeln!(out, "\n===== Top {} Keys by Access Count =====", summary.ranking.len())?;
    for (i, entry) in summary.ranking.iter().enumerate() {
        writeln!(
            out,
            "Rank {} - Key: {}, Access Count: {}, First Access: {}ms, Last Access: {}ms",
            i + 1,
            entry.key,
            entry.access_count,
            entry.first_access.as_millis(),
            entry.last_access.as_millis()
        )?;
    }

    if !summary.cache_metrics.is_empty() {
        writeln!(out, "\n===== Cache Metrics =====")?;
        for (name, value) in &summary.cache_metrics {
            writeln!(out, "{name}: {value:.2}")?;
        }
    }
    writeln!(out, "========================")?;
    Ok(())
}

/// Print the textual report to stdout
pub fn print_summary(summary: &RunSummary) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_summary(summary, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Export the summary as a single-row CSV file
pub fn export_csv(summary: &RunSummary, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.serialize(SummaryCsvRow::from(summary))?;
    writer.flush()?;
    Ok(())
}

/// Export the ranking, one row per key
pub fn export_ranking_csv(summary: &RunSummary, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (i, entry) in summary.ranking.iter().enumerate() {
        writer.serialize(RankingCsvRow::new(i + 1, entry))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats_with_counts(counts: &[(&str, u64)]) -> RunStats {
        let mut stats = RunStats::default();
        for (key, count) in counts {
            stats.access_counts.insert(key.to_string(), *count);
        }
        stats
    }

    fn run_of(stats: RunStats, elapsed: Duration) -> RunResult {
        RunResult {
            stats,
            started_at: Instant::now(),
            elapsed,
        }
    }

    #[test]
    fn test_zero_safe_figures() {
        assert_eq!(average(Duration::from_secs(3), 0), Duration::ZERO);
        assert_eq!(throughput(10, Duration::ZERO), 0.0);
        assert_eq!(miss_rate(5, 0), 0.0);
    }

    #[test]
    fn test_figures() {
        assert_eq!(average(Duration::from_millis(30), 3), Duration::from_millis(10));
        assert_eq!(throughput(500, Duration::from_secs(2)), 250.0);
        assert_eq!(miss_rate(1, 4), 25.0);
        // relative to successful gets, so it can pass 100
        assert_eq!(miss_rate(8, 4), 200.0);
    }

    #[test]
    fn test_top_n_clamps_to_available_keys() {
        let stats = stats_with_counts(&[("a", 1), ("b", 2), ("c", 3)]);
        let ranking = ranked_keys(&stats, Instant::now(), 10);
        assert_eq!(ranking.len(), 3);
        assert_eq!(ranking[0].key, "c");
        assert_eq!(ranking[2].key, "a");
    }

    #[test]
    fn test_ranking_order_and_ties() {
        let stats = stats_with_counts(&[("d", 5), ("b", 7), ("a", 5), ("c", 1), ("e", 7)]);
        let ranking = ranked_keys(&stats, Instant::now(), 4);

        let keys: Vec<_> = ranking.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["b", "e", "a", "d"]);
        assert!(ranking
            .windows(2)
            .all(|w| w[0].access_count >= w[1].access_count));
    }

    #[test]
    fn test_ranking_offsets() {
        let started_at = Instant::now();
        let mut stats = stats_with_counts(&[("read", 3), ("written", 1)]);
        stats
            .first_access
            .insert("read".into(), started_at + Duration::from_millis(5));
        stats
            .last_access
            .insert("read".into(), started_at + Duration::from_millis(9));

        let ranking = ranked_keys(&stats, started_at, 10);
        assert_eq!(ranking[0].first_access, Duration::from_millis(5));
        assert_eq!(ranking[0].last_access, Duration::from_millis(9));
        assert!(ranking[0].first_access <= ranking[0].last_access);
        assert_eq!(ranking[1].first_access, Duration::ZERO);
        assert_eq!(ranking[1].last_access, Duration::ZERO);
    }

    #[test]
    fn test_summary_text() {
        let mut stats = stats_with_counts(&[("abc", 2)]);
        stats.set_count = 4;
        stats.get_count = 2;
        stats.miss_count = 1;
        let mut metrics = BTreeMap::new();
        metrics.insert("misses".to_string(), 1.0);

        let summary =
            summarize(&run_of(stats, Duration::from_secs(1)), 10).with_cache_metrics(metrics);
        let mut out = Vec::new();
        write_summary(&summary, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("===== TEST PERFORMANCE SUMMARY ====="));
        assert!(text.contains("Total SET operations: 4"));
        assert!(text.contains("Miss rate: 50.00%"));
        assert!(text.contains("Throughput SET: 4.00 ops/sec"));
        assert!(text.contains("Rank 1 - Key: abc, Access Count: 2"));
        assert!(text.contains("misses: 1.00"));
    }

    #[test]
    fn test_empty_run_summary() {
        let summary = summarize(&run_of(RunStats::default(), Duration::ZERO), 10);
        assert_eq!(summary.avg_get_duration, Duration::ZERO);
        assert_eq!(summary.avg_set_duration, Duration::ZERO);
        assert_eq!(summary.throughput_get, 0.0);
        assert_eq!(summary.miss_rate, 0.0);
        assert!(summary.ranking.is_empty());
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let summary_path = dir.path().join("summary.csv");
        let ranking_path = dir.path().join("ranking.csv");

        let stats = stats_with_counts(&[("a", 1), ("b", 2)]);
        let summary = summarize(&run_of(stats, Duration::from_millis(10)), 10);
        export_csv(&summary, &summary_path).unwrap();
        export_ranking_csv(&summary, &ranking_path).unwrap();

        let text = std::fs::read_to_string(&summary_path).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("set_count,get_count,miss_count"));
        assert_eq!(lines.count(), 1);

        let ranking = std::fs::read_to_string(&ranking_path).unwrap();
        let lines: Vec<_> = ranking.lines().collect();
        assert_eq!(lines[0], "rank,key,access_count,first_access_ms,last_access_ms");
        assert_eq!(lines[1], "1,b,2,0,0");
        assert_eq!(lines[2], "2,a,1,0,0");
    }
}
