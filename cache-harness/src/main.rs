use clap::Parser;
use std::path::Path;
use tiered_cache::CacheMetrics;
use tracing::{dispatcher, error, info};

use cache_harness::config::{self, Args, CacheSettings, HarnessConfig};
use cache_harness::logging;
use cache_harness::report;
use cache_harness::runner::LoadTestRunner;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // before parsing, so clap's env fallbacks see the file's values
    let env_file_loaded = config::load_env_file(Path::new(config::ENV_FILE))?;
    let args = Args::parse();
    let output_csv = args.output_csv.clone();
    let ranking_csv = args.ranking_csv.clone();
    let (harness, cache_settings, log_settings) = args.into_parts();

    let dispatch = logging::build_dispatch(&log_settings);
    dispatcher::with_default(&dispatch, || {
        if env_file_loaded {
            info!(path = config::ENV_FILE, "loaded env file");
        }
        run(harness, cache_settings, dispatch.clone(), output_csv, ranking_csv)
    })
}

fn run(
    harness: HarnessConfig,
    cache_settings: CacheSettings,
    dispatch: tracing::Dispatch,
    output_csv: Option<std::path::PathBuf>,
    ranking_csv: Option<std::path::PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    harness.validate()?;

    info!(
        records = harness.records,
        max_repeats = harness.max_repeats,
        workers = ?harness.workers,
        top_n = harness.top_n,
        seed = ?harness.seed,
        memory_cache_size = cache_settings.memory_cache_size,
        secondary_cache_size = cache_settings.secondary_cache_size,
        thresholds = ?cache_settings.thresholds,
        backing_dir = %cache_settings.backing_dir.display(),
        "configuration"
    );

    // nothing runs against a half-built cache
    let cache = cache_settings.build().map_err(|e| {
        error!(error = %e, "cache setup failed");
        e
    })?;
    info!(tiers = ?cache.tier_names().collect::<Vec<_>>(), "cache ready");

    let runner = LoadTestRunner::new(harness, dispatch);
    let result = runner.run(&cache);

    let summary =
        report::summarize(&result, runner.config().top_n).with_cache_metrics(cache.metrics());
    report::print_summary(&summary)?;

    if let Some(path) = output_csv {
        report::export_csv(&summary, &path)?;
        info!(path = %path.display(), "summary exported");
    }
    if let Some(path) = ranking_csv {
        report::export_ranking_csv(&summary, &path)?;
        info!(path = %path.display(), "ranking exported");
    }

    Ok(())
}
