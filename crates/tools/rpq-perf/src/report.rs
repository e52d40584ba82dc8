//! Derived report files: the hand-off point to the chart renderer.
//!
//! A [`ReportSink`] receives the comparison and the two raw time series.
//! [`TextReports`] writes the space-delimited per-query files the plotting
//! scripts read; [`JsonReport`] writes a single JSON document.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::aggregate::PlatformSummaries;
use crate::compare::{Comparison, ComparisonRow, Exclusion, Totals};
use crate::diagnostic::Diagnostic;
use crate::series::TimeSeries;

/// Time above which a query lands in `bench_diff_big.txt`.
pub const BIG_QUERY_SECONDS: f64 = 1.0;

/// Errors writing reports.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A report file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// JSON serialization failed.
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
    /// Flushing a report stream failed.
    #[error("failed to flush report: {0}")]
    Flush(#[source] io::Error),
}

/// Everything a sink receives.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// Joined, ranked comparison.
    pub comparison: &'a Comparison,
    /// Raw CPU series.
    pub cpu: &'a TimeSeries,
    /// Raw GPU series.
    pub gpu: &'a TimeSeries,
}

/// Consumer of comparison output.
pub trait ReportSink {
    /// Consume one comparison.
    fn consume(&mut self, input: &ReportInput<'_>) -> Result<(), ReportError>;
}

/// Writes derived text files into a directory.
#[derive(Debug, Clone)]
pub struct TextReports {
    dir: PathBuf,
    big_seconds: f64,
    written: Vec<PathBuf>,
}

impl TextReports {
    /// Reports in `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            big_seconds: BIG_QUERY_SECONDS,
            written: Vec::new(),
        }
    }

    /// Override the `bench_diff_big.txt` threshold.
    #[must_use]
    pub fn with_big_threshold(mut self, seconds: f64) -> Self {
        self.big_seconds = seconds;
        self
    }

    /// Files written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write_file<F>(&mut self, name: &str, body: F) -> Result<(), ReportError>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        let path = self.dir.join(name);
        let io_err = |source| ReportError::Io {
            path: path.clone(),
            source,
        };
        let mut w = BufWriter::new(File::create(&path).map_err(io_err)?);
        body(&mut w).and_then(|()| w.flush()).map_err(io_err)?;
        tracing::debug!(path = %path.display(), "wrote report");
        self.written.push(path);
        Ok(())
    }
}

impl ReportSink for TextReports {
    fn consume(&mut self, input: &ReportInput<'_>) -> Result<(), ReportError> {
        fs::create_dir_all(&self.dir).map_err(|source| ReportError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let by_query = input.comparison.rows_by_query();
        let big = input.comparison.big(self.big_seconds);

        self.write_file("result_cpu.txt", |w| write_series(w, input.cpu))?;
        self.write_file("result_gpu.txt", |w| write_series(w, input.gpu))?;
        self.write_file("bench_diff.txt", |w| write_diff(w, &by_query))?;
        self.write_file("bench_diff_big.txt", |w| write_diff(w, &big))?;
        self.write_file("errors.txt", |w| write_errors(w, &by_query))?;
        self.write_file("rel_errors.txt", |w| write_relative_errors(w, &by_query))?;
        self.write_file("speedups.txt", |w| {
            write_speedups(w, input.comparison.rows())
        })?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    totals: Totals,
    mean_speedup: Option<f64>,
    median_speedup: Option<f64>,
    rows: &'a [ComparisonRow],
    excluded: &'a [Exclusion],
    anomalies: &'a [Diagnostic],
    cpu_series: &'a [f64],
    gpu_series: &'a [f64],
}

/// Writes the comparison as one pretty-printed JSON document.
#[derive(Debug)]
pub struct JsonReport<W> {
    writer: W,
}

impl<W: Write> JsonReport<W> {
    /// Report written to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Recover the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonReport<BufWriter<File>> {
    /// Report written to a new file at `path`.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        let file = File::create(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ReportSink for JsonReport<W> {
    fn consume(&mut self, input: &ReportInput<'_>) -> Result<(), ReportError> {
        let c = input.comparison;
        let doc = JsonDocument {
            totals: c.totals(),
            mean_speedup: c.mean_speedup(),
            median_speedup: c.median_speedup(),
            rows: c.rows(),
            excluded: c.excluded(),
            anomalies: c.diagnostics(),
            cpu_series: input.cpu.values(),
            gpu_series: input.gpu.values(),
        };
        serde_json::to_writer_pretty(&mut self.writer, &doc)?;
        self.writer.flush().map_err(ReportError::Flush)?;
        Ok(())
    }
}

/// `<id> <time>` for every non-zero entry of a series.
pub fn write_series(w: &mut impl Write, series: &TimeSeries) -> io::Result<()> {
    for (id, time) in series.iter().filter(|&(_, t)| t != 0.0) {
        writeln!(w, "{id} {time}")?;
    }
    Ok(())
}

/// `<id> <cpu> <gpu>` per row.
pub fn write_diff(w: &mut impl Write, rows: &[&ComparisonRow]) -> io::Result<()> {
    for r in rows {
        writeln!(w, "{} {} {}", r.query_id, r.cpu_time(), r.gpu_time())?;
    }
    Ok(())
}

/// `<id> <cpu_sd> <gpu_sd>` per row.
pub fn write_errors(w: &mut impl Write, rows: &[&ComparisonRow]) -> io::Result<()> {
    for r in rows {
        writeln!(
            w,
            "{} {} {}",
            r.query_id,
            r.cpu.std_dev_or_zero(),
            r.gpu.std_dev_or_zero()
        )?;
    }
    Ok(())
}

/// `<id> <cpu_rel> <gpu_rel>` per row, zero where unavailable.
pub fn write_relative_errors(w: &mut impl Write, rows: &[&ComparisonRow]) -> io::Result<()> {
    for r in rows {
        writeln!(
            w,
            "{} {} {}",
            r.query_id,
            r.cpu.relative_error().unwrap_or(0.0),
            r.gpu.relative_error().unwrap_or(0.0)
        )?;
    }
    Ok(())
}

/// `<id> <speedup> <abs_error>` in ranking order.
pub fn write_speedups(w: &mut impl Write, rows: &[ComparisonRow]) -> io::Result<()> {
    for r in rows {
        writeln!(w, "{} {} {}", r.query_id, r.speedup, r.absolute_error)?;
    }
    Ok(())
}

/// Aggregated `result.txt`: `<id> <mean:.6> <sd:.6> <answers>`.
///
/// This is the layout [`rpq_log::LineSchema::space_delimited`] reads.
pub fn write_summaries(w: &mut impl Write, summaries: &PlatformSummaries) -> io::Result<()> {
    for s in summaries.iter() {
        writeln!(
            w,
            "{} {:.6} {:.6} {}",
            s.query_id,
            s.mean_time,
            s.std_dev_or_zero(),
            s.answer_count.unwrap_or(0)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::QuerySummary;
    use rpq_log::{LineSchema, Platform, parse_log};

    fn summaries(platform: Platform, rows: &[(u32, f64, Option<f64>)]) -> PlatformSummaries {
        let mut set = PlatformSummaries::new(platform);
        for &(query_id, mean_time, sd) in rows {
            set.insert(QuerySummary {
                query_id,
                mean_time,
                sample_std_dev: sd,
                answer_count: Some(u64::from(query_id) * 10),
                runs: 3,
            });
        }
        set
    }

    #[test]
    fn summaries_are_readable_as_result_txt() {
        let set = summaries(Platform::Gpu, &[(1, 0.25, Some(0.01)), (2, 1.5, None)]);
        let mut out = Vec::new();
        write_summaries(&mut out, &set).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "1 0.250000 0.010000 10\n2 1.500000 0.000000 20\n");

        let parsed = parse_log(&text, &LineSchema::space_delimited());
        assert!(parsed.is_clean());
        let reread = PlatformSummaries::from_reported(Platform::Gpu, &parsed.measurements);
        assert_eq!(reread.get(1).unwrap().mean_time, 0.25);
        assert_eq!(reread.get(2).unwrap().answer_count, Some(20));
    }

    #[test]
    fn diff_and_speedup_lines() {
        let cpu = summaries(Platform::Cpu, &[(1, 2.0, Some(0.2)), (2, 3.0, None)]);
        let gpu = summaries(Platform::Gpu, &[(1, 1.0, Some(0.5)), (2, 6.0, None)]);
        let cmp = Comparison::new(&cpu, &gpu);

        let mut diff = Vec::new();
        write_diff(&mut diff, &cmp.rows_by_query()).unwrap();
        assert_eq!(String::from_utf8(diff).unwrap(), "1 2 1\n2 3 6\n");

        let mut speedups = Vec::new();
        write_speedups(&mut speedups, cmp.rows()).unwrap();
        let text = String::from_utf8(speedups).unwrap();
        assert!(text.starts_with("2 0.5 0\n1 2 "));
    }

    #[test]
    fn json_report_contains_totals_and_rows() {
        let cpu = summaries(Platform::Cpu, &[(1, 2.0, None)]);
        let gpu = summaries(Platform::Gpu, &[(1, 1.0, None), (2, 1.0, None)]);
        let cmp = Comparison::new(&cpu, &gpu);
        let (cpu_series, _) = TimeSeries::from_summaries(&cpu, Some(2));
        let (gpu_series, _) = TimeSeries::from_summaries(&gpu, Some(2));

        let mut sink = JsonReport::new(Vec::new());
        sink.consume(&ReportInput {
            comparison: &cmp,
            cpu: &cpu_series,
            gpu: &gpu_series,
        })
        .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        assert_eq!(value["totals"]["wins"], 1);
        assert_eq!(value["rows"][0]["speedup"], 2.0);
        assert_eq!(value["excluded"][0]["reason"], "missing_cpu");
        assert_eq!(value["gpu_series"], serde_json::json!([1.0, 1.0]));
    }
}
