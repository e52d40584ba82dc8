//! `rpqstat load`: query construction versus execution time.

use std::io;

use anyhow::{Result, bail};
use rpq_perf::load::{LoadAnalysis, SUSPICIOUS_LOAD_RATIO};
use rpq_perf::output::print_load;

use crate::cli::LoadArgs;
use crate::config::DatasetConfig;
use crate::input::{RAW_RUN_SCHEMA, read_runs, show_diagnostics};
use crate::verbose::dprintln;

/// Analyze load timings of raw GPU runs or per-query logs.
pub fn cmd_load(args: &LoadArgs, config: &DatasetConfig) -> Result<()> {
    let (analysis, diagnostics) = match &args.logs {
        Some(dir) => {
            let Some(universe) = args.universe.or(config.universe) else {
                bail!("--logs needs the query count (pass --universe or set it in rpqstat.toml)");
            };
            LoadAnalysis::from_logs(dir, universe)?
        }
        None => {
            let schema = args.schema.to_input(&args.runs).schema(RAW_RUN_SCHEMA);
            let (runs, diagnostics) = read_runs(&args.runs, &schema)?;
            (LoadAnalysis::from_measurements(runs.iter().flatten()), diagnostics)
        }
    };
    if analysis.is_empty() {
        bail!("no load timings found (the files need a load_time column or annotated lines)");
    }

    let threshold = args
        .threshold
        .or(config.thresholds.suspicious_load)
        .unwrap_or(SUSPICIOUS_LOAD_RATIO);
    let mut out = io::stdout();
    print_load(&mut out, &analysis, threshold)?;

    if args.fastest > 0 {
        println!("  Fastest {}:", args.fastest);
        for t in analysis.fastest(args.fastest) {
            println!(
                "  {:>8}  exec {:.6} s  load {:.6} s",
                t.query_id, t.execute_seconds, t.load_seconds
            );
        }
    }

    if let Some(max) = args.max_exec {
        let fast = analysis.at_most(max);
        let load: f64 = fast.iter().map(|t| t.load_seconds).sum();
        let exec: f64 = fast.iter().map(|t| t.execute_seconds).sum();
        dprintln!(
            "  Executing in at most {max} s: {} queries, load {load:.6} s, exec {exec:.6} s",
            fast.len()
        );
    }

    show_diagnostics(&diagnostics)
}
