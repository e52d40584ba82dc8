//! `rpqstat compare` and `rpqstat types`.

use std::io;

use anyhow::{Context, Result, anyhow};
use rpq_perf::compare::DEFAULT_FLAG_THRESHOLD;
use rpq_perf::output::{print_rows, print_summary, print_types};
use rpq_perf::report::{BIG_QUERY_SECONDS, JsonReport, ReportInput, ReportSink, TextReports};
use rpq_perf::{Comparison, QueryTypes, TimeSeries, group_by_type};

use crate::cli::{CompareArgs, TypesArgs};
use crate::config::{DEFAULT_PER_TYPE, DatasetConfig};
use crate::input::{self, show_diagnostics};
use crate::verbose::{Timer, dprintln, is_verbose};

/// Compare CPU and GPU results and optionally write reports.
pub fn cmd_compare(args: &CompareArgs, config: &DatasetConfig) -> Result<()> {
    let (cpu, gpu) = input::load_pair(&args.pair, config)?;
    let universe = input::universe(args.pair.universe, config, &cpu, &gpu);

    let cmp = {
        let _t = Timer::start("comparison");
        Comparison::new(&cpu.summaries, &gpu.summaries)
    };

    let mut out = io::stdout();
    print_summary(&mut out, &cmp, config.top(args.top))?;

    let threshold = args
        .threshold
        .or(config.thresholds.flag)
        .unwrap_or(DEFAULT_FLAG_THRESHOLD);
    let flagged = cmp.flagged(threshold);
    match Comparison::average(flagged) {
        Some(avg) => dprintln!(
            "  Speedup >= {threshold}: {} queries, mean speedup {avg:.3}",
            flagged.len()
        ),
        None => dprintln!("  Speedup >= {threshold}: none"),
    }
    if is_verbose() && !flagged.is_empty() {
        print_rows(&mut out, flagged)?;
    }

    let mismatches = cmp.answer_mismatches().count();
    if mismatches > 0 {
        println!("  Answer mismatches: {mismatches}");
    }

    let big_seconds = args
        .big
        .or(config.thresholds.big_seconds)
        .unwrap_or(BIG_QUERY_SECONDS);
    if args.reports.is_some() || args.json.is_some() {
        let (cpu_series, cpu_diags) = TimeSeries::from_summaries(&cpu.summaries, Some(universe));
        let (gpu_series, gpu_diags) = TimeSeries::from_summaries(&gpu.summaries, Some(universe));
        let report = ReportInput {
            comparison: &cmp,
            cpu: &cpu_series,
            gpu: &gpu_series,
        };

        if let Some(dir) = &args.reports {
            let mut sink = TextReports::new(dir).with_big_threshold(big_seconds);
            sink.consume(&report)
                .with_context(|| format!("writing reports to {}", dir.display()))?;
            dprintln!("  Wrote {} reports to {}", sink.written().len(), dir.display());
        }
        if let Some(path) = &args.json {
            let mut sink = JsonReport::create(path)?;
            sink.consume(&report)
                .with_context(|| format!("writing {}", path.display()))?;
            dprintln!("  Wrote {}", path.display());
        }

        show_diagnostics(&cpu_diags)?;
        show_diagnostics(&gpu_diags)?;
    }

    show_diagnostics(&cpu.diagnostics)?;
    show_diagnostics(&gpu.diagnostics)?;
    show_diagnostics(cmp.diagnostics())
}

/// Sum eligible CPU and GPU times per query type.
pub fn cmd_types(args: &TypesArgs, config: &DatasetConfig) -> Result<()> {
    let (cpu, gpu) = input::load_pair(&args.pair, config)?;
    let universe = input::universe(args.pair.universe, config, &cpu, &gpu);
    let cmp = Comparison::new(&cpu.summaries, &gpu.summaries);

    let per_type = args
        .per_type
        .or(config.per_type)
        .unwrap_or(DEFAULT_PER_TYPE);
    let types = match args.types.or(config.types) {
        Some(count) => QueryTypes::checked(count, per_type).ok_or_else(|| {
            anyhow!("{count} types of {per_type} queries do not fit the query id range")
        })?,
        None => QueryTypes::covering(universe, per_type),
    };
    let exclude = if args.exclude.is_empty() {
        &config.exclude_types
    } else {
        &args.exclude
    };

    let (cpu_series, gpu_series) = cmp.series(types.universe().max(universe));
    let groups = group_by_type(types, &cpu_series, &gpu_series, exclude);

    dprintln!(
        "{} types of {} queries{}",
        types.type_count,
        types.per_type,
        if exclude.is_empty() {
            String::new()
        } else {
            format!(", excluding {exclude:?}")
        }
    );
    print_types(&mut io::stdout(), &groups)?;

    let cpu_sum: f64 = groups.iter().map(|g| g.cpu_time).sum();
    let gpu_sum: f64 = groups.iter().map(|g| g.gpu_time).sum();
    println!("  Sum over types: CPU {cpu_sum:.6} s, GPU {gpu_sum:.6} s");

    show_diagnostics(cmp.diagnostics())
}
