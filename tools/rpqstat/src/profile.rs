//! `rpqstat profile`: GPU times against per-query structure.

use std::io;

use anyhow::{Context, Result, anyhow};
use rpq_log::Platform;
use rpq_perf::enrich::enrich;
use rpq_perf::output::print_profiles;

use crate::cli::ProfileArgs;
use crate::config::DatasetConfig;
use crate::input::{load_platform, show_diagnostics};
use crate::verbose::{dprintln, is_verbose};

/// Join GPU summaries with `queries_logs/<id>.txt` profiles.
pub fn cmd_profile(args: &ProfileArgs, config: &DatasetConfig) -> Result<()> {
    let dir = args
        .logs
        .as_ref()
        .or(config.profiles.as_ref())
        .ok_or_else(|| anyhow!("no profile directory given (pass --logs or set `profiles`)"))?;

    let input = args.schema.to_input(&args.gpu).or(&config.gpu);
    let gpu = load_platform(Platform::Gpu, &input)?;

    let enrichment = enrich(&gpu.summaries, dir)
        .with_context(|| format!("reading profiles from {}", dir.display()))?;
    dprintln!(
        "{} of {} queries profiled",
        enrichment.queries.len(),
        gpu.summaries.len()
    );

    print_profiles(&mut io::stdout(), &enrichment)?;

    if is_verbose() {
        let series = [
            ("nvals", enrichment.by_nvals(args.min_time)),
            ("iterations", enrichment.by_iterations(args.min_time)),
            ("multiplications", enrichment.by_multiplications(args.min_time)),
        ];
        for (label, points) in series {
            println!("  time by {label}:");
            for (key, time) in points {
                println!("    {key} {time}");
            }
        }
    }

    show_diagnostics(&gpu.diagnostics)?;
    show_diagnostics(&enrichment.diagnostics)
}
