//! Reading result files into per-platform summaries.

use std::io;
use std::path::PathBuf;

use anyhow::{Result, bail};
use rpq_log::{AuxColumn, LineSchema, Platform, QueryMeasurement, TimeUnit, read_log};
use rpq_perf::output::print_diagnostics;
use rpq_perf::{Diagnostic, PlatformSummaries, aggregate_runs};

use crate::cli::PairArgs;
use crate::config::{DatasetConfig, InputConfig};
use crate::verbose::{Timer, dprintln, is_verbose, vprintln};

/// Raw per-run GPU file: `<id> <exec_us> <load_us> <answers>`.
pub const RAW_RUN_SCHEMA: LineSchema = LineSchema::space_delimited()
    .with_aux(AuxColumn::LoadTime)
    .with_time_unit(TimeUnit::Microseconds);

/// Summaries of one platform and the anomalies found reading them.
pub struct Loaded {
    /// Per-query summaries.
    pub summaries: PlatformSummaries,
    /// Malformed lines and aggregation anomalies.
    pub diagnostics: Vec<Diagnostic>,
}

/// Default schema of a platform's result files.
pub fn default_schema(platform: Platform) -> LineSchema {
    match platform {
        Platform::Cpu => LineSchema::comma_delimited(),
        Platform::Gpu => LineSchema::space_delimited(),
    }
}

/// Parse every file in `files` with `schema`, one run per file.
pub fn read_runs(
    files: &[PathBuf],
    schema: &LineSchema,
) -> Result<(Vec<Vec<QueryMeasurement>>, Vec<Diagnostic>)> {
    let mut runs = Vec::with_capacity(files.len());
    let mut diagnostics = Vec::new();

    for path in files {
        let log = read_log(path, schema)?;
        vprintln!(
            "  {}: {} measurements, {} rejected",
            path.display(),
            log.measurements.len(),
            log.rejected.len()
        );
        let origin = path.display().to_string();
        diagnostics.extend(
            log.rejected
                .iter()
                .map(|err| Diagnostic::malformed_line(&origin, err)),
        );
        runs.push(log.measurements);
    }

    Ok((runs, diagnostics))
}

/// Load the summaries of one platform.
///
/// A single file is read as an already aggregated result; several files are
/// aggregated as repeated runs.
pub fn load_platform(platform: Platform, input: &InputConfig) -> Result<Loaded> {
    if input.files.is_empty() {
        bail!(
            "no {platform} result files given (pass --{} or set them in rpqstat.toml)",
            platform.to_string().to_lowercase()
        );
    }
    let _t = Timer::start("reading results");

    let schema = input.schema(default_schema(platform));
    let (runs, mut diagnostics) = read_runs(&input.files, &schema)?;

    let summaries = if let [single] = runs.as_slice() {
        PlatformSummaries::from_reported(platform, single)
    } else {
        let aggregated = aggregate_runs(platform, &runs);
        diagnostics.extend(aggregated.diagnostics);
        aggregated.summaries
    };

    vprintln!("  {platform}: {} queries summarized", summaries.len());
    Ok(Loaded {
        summaries,
        diagnostics,
    })
}

/// Load both platforms, with flags taking precedence over the dataset file.
pub fn load_pair(args: &PairArgs, config: &DatasetConfig) -> Result<(Loaded, Loaded)> {
    let cpu = load_platform(Platform::Cpu, &args.cpu_input().or(&config.cpu))?;
    let gpu = load_platform(Platform::Gpu, &args.gpu_input().or(&config.gpu))?;
    Ok((cpu, gpu))
}

/// Universe size: flag, dataset file, or the largest id on either side.
pub fn universe(flag: Option<u32>, config: &DatasetConfig, cpu: &Loaded, gpu: &Loaded) -> u32 {
    flag.or(config.universe).unwrap_or_else(|| {
        cpu.summaries
            .max_query_id()
            .max(gpu.summaries.max_query_id())
            .unwrap_or(0)
    })
}

/// Print answer mismatches always, other diagnostics in verbose mode.
pub fn show_diagnostics(diagnostics: &[Diagnostic]) -> Result<()> {
    let mut out = io::stdout();
    print_diagnostics(&mut out, diagnostics.iter().filter(|d| d.is_answer_mismatch()))?;

    let others = diagnostics.iter().filter(|d| !d.is_answer_mismatch());
    if is_verbose() {
        print_diagnostics(&mut out, others)?;
    } else {
        let count = others.count();
        if count > 0 {
            dprintln!("  {count} data-quality diagnostics (use -v to list)");
        }
    }
    Ok(())
}
