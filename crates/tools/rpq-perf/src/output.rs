//! Terminal tables for comparison results.

use std::io::{self, Write};

use rpq_log::QueryId;

use crate::compare::{Comparison, ComparisonRow};
use crate::diagnostic::Diagnostic;
use crate::enrich::Enrichment;
use crate::group::TypeAggregate;
use crate::load::LoadAnalysis;

/// Print totals, win count, mean/median speedup and the extremes.
pub fn print_summary(w: &mut impl Write, cmp: &Comparison, top: usize) -> io::Result<()> {
    if cmp.is_empty() {
        writeln!(w, "  No comparable queries.")?;
        return Ok(());
    }

    let totals = cmp.totals();
    writeln!(w)?;
    writeln!(w, "  Eligible queries: {}", totals.eligible)?;
    writeln!(w, "  Excluded queries: {}", cmp.excluded().len())?;
    writeln!(w, "  Total CPU time:   {:.6} s", totals.cpu_time)?;
    writeln!(w, "  Total GPU time:   {:.6} s", totals.gpu_time)?;
    if let Some(ratio) = totals.ratio {
        writeln!(w, "  CPU / GPU:        {ratio:.3}")?;
    }
    writeln!(
        w,
        "  GPU faster on:    {} of {}",
        totals.wins, totals.eligible
    )?;
    if let (Some(mean), Some(median)) = (cmp.mean_speedup(), cmp.median_speedup()) {
        writeln!(w, "  Mean speedup:     {mean:.3}")?;
        writeln!(w, "  Median speedup:   {median:.3}")?;
    }

    writeln!(w)?;
    writeln!(w, "  Worst {top}:")?;
    print_rows(w, cmp.worst(top).iter())?;

    writeln!(w)?;
    writeln!(w, "  Best {top}:")?;
    print_rows(w, cmp.best(top))?;
    writeln!(w)?;
    Ok(())
}

/// Print a speedup table with the propagated error of each row.
pub fn print_rows<'a>(
    w: &mut impl Write,
    rows: impl IntoIterator<Item = &'a ComparisonRow>,
) -> io::Result<()> {
    writeln!(
        w,
        "  {:>8}  {:>12}  {:>12}  {:>10}  {:>10}  {:>7}",
        "Query", "CPU (s)", "GPU (s)", "Speedup", "Error", "Answers"
    )?;
    writeln!(
        w,
        "  {:->8}  {:->12}  {:->12}  {:->10}  {:->10}  {:->7}",
        "", "", "", "", "", ""
    )?;
    for r in rows {
        writeln!(
            w,
            "  {:>8}  {:>12.6}  {:>12.6}  {:>10.3}  {:>10.3}  {:>7}",
            r.query_id,
            r.cpu_time(),
            r.gpu_time(),
            r.speedup,
            r.absolute_error,
            if r.answers_agree { "ok" } else { "DIFFER" }
        )?;
    }
    Ok(())
}

/// Print per-type sums.
pub fn print_types(w: &mut impl Write, groups: &[TypeAggregate]) -> io::Result<()> {
    if groups.is_empty() {
        writeln!(w, "  No query types to display.")?;
        return Ok(());
    }

    writeln!(w)?;
    writeln!(
        w,
        "  {:>5}  {:>13}  {:>12}  {:>12}  {:>8}",
        "Type", "Queries", "CPU (s)", "GPU (s)", "Speedup"
    )?;
    writeln!(
        w,
        "  {:->5}  {:->13}  {:->12}  {:->12}  {:->8}",
        "", "", "", "", ""
    )?;
    for g in groups {
        let speedup = g
            .speedup()
            .map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
        writeln!(
            w,
            "  {:>5}  {:>13}  {:>12.6}  {:>12.6}  {:>8}",
            g.query_type,
            format!("{}-{}", g.first_query, g.last_query),
            g.cpu_time,
            g.gpu_time,
            speedup
        )?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print the `top` largest relative errors of one platform.
pub fn print_relative_errors(
    w: &mut impl Write,
    label: &str,
    errors: &[(QueryId, f64)],
    top: usize,
) -> io::Result<()> {
    writeln!(w, "  Largest {label} relative errors:")?;
    writeln!(w, "  {:>8}  {:>10}", "Query", "Rel. err")?;
    writeln!(w, "  {:->8}  {:->10}", "", "")?;
    for (id, err) in errors.iter().take(top) {
        writeln!(w, "  {id:>8}  {err:>10.4}")?;
    }
    Ok(())
}

/// Print load totals and the queries whose load time reaches `threshold`
/// times their execution time.
pub fn print_load(w: &mut impl Write, load: &LoadAnalysis, threshold: f64) -> io::Result<()> {
    if load.is_empty() {
        writeln!(w, "  No load timings to display.")?;
        return Ok(());
    }

    writeln!(w)?;
    writeln!(w, "  Queries:            {}", load.len())?;
    writeln!(w, "  Total load time:    {:.6} s", load.total_load())?;
    writeln!(w, "  Total execute time: {:.6} s", load.total_execute())?;

    let suspicious = load.suspicious(threshold);
    writeln!(w)?;
    writeln!(w, "  Load / execute >= {threshold}: {}", suspicious.len())?;
    if !suspicious.is_empty() {
        writeln!(w, "  {:>8}  {:>10}", "Query", "Ratio")?;
        writeln!(w, "  {:->8}  {:->10}", "", "")?;
        for (id, ratio) in &suspicious {
            writeln!(w, "  {id:>8}  {ratio:>10.3}")?;
        }
    }
    writeln!(w)?;
    Ok(())
}

/// Print enriched profile points.
pub fn print_profiles(w: &mut impl Write, enrichment: &Enrichment) -> io::Result<()> {
    if enrichment.queries.is_empty() {
        writeln!(w, "  No profiled queries to display.")?;
        return Ok(());
    }

    writeln!(w)?;
    writeln!(
        w,
        "  {:>8}  {:>12}  {:>10}  {:>10}  {:>12}",
        "Query", "Time (s)", "Iters", "Mults", "Nvals"
    )?;
    writeln!(
        w,
        "  {:->8}  {:->12}  {:->10}  {:->10}  {:->12}",
        "", "", "", "", ""
    )?;
    for q in &enrichment.queries {
        let mults = q
            .profile
            .multiplication_count
            .map_or_else(|| "-".to_string(), |m| m.to_string());
        writeln!(
            w,
            "  {:>8}  {:>12.6}  {:>10}  {:>10}  {:>12}",
            q.query_id,
            q.execute_seconds,
            q.profile.iteration_count,
            mults,
            q.profile.nvals_total()
        )?;
    }

    let dims = enrichment.dimensions();
    if !dims.is_empty() {
        let dims: Vec<String> = dims.iter().map(u64::to_string).collect();
        writeln!(w)?;
        writeln!(w, "  Matrix dimensions: {}", dims.join(", "))?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print diagnostics, one per line.
pub fn print_diagnostics<'a>(
    w: &mut impl Write,
    diagnostics: impl IntoIterator<Item = &'a Diagnostic>,
) -> io::Result<()> {
    for d in diagnostics {
        writeln!(w, "  warning: {d}")?;
    }
    Ok(())
}
