//! `rpqstat collect`: repeated runs into one aggregated result file.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use rpq_perf::aggregate_runs;
use rpq_perf::output::print_relative_errors;
use rpq_perf::report::write_summaries;

use crate::cli::CollectArgs;
use crate::config::DatasetConfig;
use crate::input::{RAW_RUN_SCHEMA, read_runs, show_diagnostics};
use crate::verbose::{Timer, dprintln};

/// Relative errors printed when neither flag nor dataset file set a count.
const DEFAULT_ERROR_TOP: usize = 10;

/// Aggregate the run files and write `result.txt`.
pub fn cmd_collect(args: &CollectArgs, config: &DatasetConfig) -> Result<()> {
    let _t = Timer::start("collect");
    let schema = args.schema.to_input(&args.runs).schema(RAW_RUN_SCHEMA);

    dprintln!(
        "Aggregating {} {} runs ({})...",
        args.runs.len(),
        args.platform,
        schema.format
    );
    let (runs, mut diagnostics) = read_runs(&args.runs, &schema)?;
    let aggregated = aggregate_runs(args.platform, &runs);
    diagnostics.extend(aggregated.diagnostics);
    let summaries = aggregated.summaries;

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut w = BufWriter::new(file);
    write_summaries(&mut w, &summaries)
        .and_then(|()| w.flush())
        .with_context(|| format!("writing {}", args.output.display()))?;

    dprintln!(
        "  {} queries written to {}",
        summaries.len(),
        args.output.display()
    );

    let top = args
        .top
        .or(config.thresholds.top)
        .unwrap_or(DEFAULT_ERROR_TOP);
    print_relative_errors(
        &mut io::stdout(),
        &args.platform.to_string(),
        &summaries.by_relative_error(),
        top,
    )?;

    show_diagnostics(&diagnostics)
}
