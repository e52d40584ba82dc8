//! CPU versus GPU comparison of per-query summaries.
//!
//! Queries are joined by id. A query takes part in rankings and totals only
//! if both platforms summarized it with a non-zero mean time; every other
//! query is listed in [`Comparison::excluded`] with the reason.

use std::collections::BTreeSet;

use rpq_log::QueryId;
use serde::Serialize;

use crate::aggregate::{PlatformSummaries, QuerySummary};
use crate::diagnostic::Diagnostic;
use crate::series::TimeSeries;

/// Default speedup at or above which a query is flagged.
pub const DEFAULT_FLAG_THRESHOLD: f64 = 1.0;

/// Whether a query can be compared across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Eligibility {
    /// Both summaries present with non-zero mean time.
    Eligible,
    /// No CPU summary.
    MissingCpu,
    /// No GPU summary.
    MissingGpu,
    /// CPU mean time is zero.
    ZeroCpu,
    /// GPU mean time is zero.
    ZeroGpu,
}

impl Eligibility {
    /// Evaluate the predicate for one query.
    pub fn evaluate(cpu: Option<&QuerySummary>, gpu: Option<&QuerySummary>) -> Self {
        match (cpu, gpu) {
            (None, _) => Self::MissingCpu,
            (_, None) => Self::MissingGpu,
            (Some(c), _) if c.mean_time == 0.0 => Self::ZeroCpu,
            (_, Some(g)) if g.mean_time == 0.0 => Self::ZeroGpu,
            _ => Self::Eligible,
        }
    }

    /// Returns `true` for [`Eligibility::Eligible`].
    pub fn is_eligible(self) -> bool {
        self == Self::Eligible
    }
}

/// Propagated absolute error of `cpu_time / gpu_time`.
///
/// `|cpu · gpu_sd − gpu · cpu_sd| / gpu²`, with absolute standard
/// deviations.
pub fn speedup_error(cpu_time: f64, cpu_sd: f64, gpu_time: f64, gpu_sd: f64) -> f64 {
    (cpu_time * gpu_sd - gpu_time * cpu_sd).abs() / (gpu_time * gpu_time)
}

/// One eligible query joined across platforms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    /// Query index.
    pub query_id: QueryId,
    /// CPU summary.
    pub cpu: QuerySummary,
    /// GPU summary.
    pub gpu: QuerySummary,
    /// `cpu.mean_time / gpu.mean_time`; above 1 the GPU is faster.
    pub speedup: f64,
    /// Propagated error of the speedup, see [`speedup_error`].
    pub absolute_error: f64,
    /// `false` if both platforms report answer counts and they differ.
    pub answers_agree: bool,
}

impl ComparisonRow {
    fn join(cpu: &QuerySummary, gpu: &QuerySummary) -> Self {
        let answers_agree = match (cpu.answer_count, gpu.answer_count) {
            (Some(c), Some(g)) => c == g,
            _ => true,
        };
        Self {
            query_id: cpu.query_id,
            cpu: cpu.clone(),
            gpu: gpu.clone(),
            speedup: cpu.mean_time / gpu.mean_time,
            absolute_error: speedup_error(
                cpu.mean_time,
                cpu.std_dev_or_zero(),
                gpu.mean_time,
                gpu.std_dev_or_zero(),
            ),
            answers_agree,
        }
    }

    /// CPU mean time in seconds.
    pub fn cpu_time(&self) -> f64 {
        self.cpu.mean_time
    }

    /// GPU mean time in seconds.
    pub fn gpu_time(&self) -> f64 {
        self.gpu.mean_time
    }

    /// Returns `true` if the GPU was strictly faster.
    pub fn gpu_wins(&self) -> bool {
        self.gpu.mean_time < self.cpu.mean_time
    }
}

/// A query left out of the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    /// Query index.
    pub query_id: QueryId,
    /// Why it was excluded.
    pub reason: Eligibility,
}

/// Aggregate figures over the eligible queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    /// Sum of CPU mean times.
    pub cpu_time: f64,
    /// Sum of GPU mean times.
    pub gpu_time: f64,
    /// `cpu_time / gpu_time`, if any GPU time was summed.
    pub ratio: Option<f64>,
    /// Queries where the GPU was strictly faster.
    pub wins: usize,
    /// Number of eligible queries.
    pub eligible: usize,
}

/// The joined, ranked comparison of two platforms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    rows: Vec<ComparisonRow>,
    excluded: Vec<Exclusion>,
    diagnostics: Vec<Diagnostic>,
}

impl Comparison {
    /// Join CPU and GPU summaries.
    ///
    /// Rows are sorted ascending by speedup, ties in query id order.
    pub fn new(cpu: &PlatformSummaries, gpu: &PlatformSummaries) -> Self {
        let ids: BTreeSet<QueryId> = cpu.query_ids().chain(gpu.query_ids()).collect();

        let mut rows = Vec::new();
        let mut excluded = Vec::new();
        let mut diagnostics = Vec::new();

        for query_id in ids {
            let (c, g) = (cpu.get(query_id), gpu.get(query_id));
            let (Some(c), Some(g), Eligibility::Eligible) = (c, g, Eligibility::evaluate(c, g))
            else {
                excluded.push(Exclusion {
                    query_id,
                    reason: Eligibility::evaluate(c, g),
                });
                continue;
            };

            let row = ComparisonRow::join(c, g);
            if let (false, Some(cpu_answers), Some(gpu_answers)) =
                (row.answers_agree, c.answer_count, g.answer_count)
            {
                let d = Diagnostic::AnswerMismatch {
                    query_id,
                    cpu: cpu_answers,
                    gpu: gpu_answers,
                };
                d.emit();
                diagnostics.push(d);
            }
            rows.push(row);
        }

        rows.sort_by(|a, b| a.speedup.total_cmp(&b.speedup));

        tracing::debug!(
            eligible = rows.len(),
            excluded = excluded.len(),
            mismatches = diagnostics.len(),
            "compared platforms"
        );

        Self {
            rows,
            excluded,
            diagnostics,
        }
    }

    /// Eligible rows, ascending by speedup.
    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    /// Eligible rows in query id order.
    pub fn rows_by_query(&self) -> Vec<&ComparisonRow> {
        let mut rows: Vec<&ComparisonRow> = self.rows.iter().collect();
        rows.sort_by_key(|r| r.query_id);
        rows
    }

    /// Row for `query_id`, if eligible.
    pub fn row(&self, query_id: QueryId) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.query_id == query_id)
    }

    /// Number of eligible queries.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if no query was eligible.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Queries left out, in id order.
    pub fn excluded(&self) -> &[Exclusion] {
        &self.excluded
    }

    /// Answer mismatches between platforms.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Rows whose CPU and GPU answer counts differ.
    pub fn answer_mismatches(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|r| !r.answers_agree)
    }

    /// The `n` smallest speedups, smallest first.
    pub fn worst(&self, n: usize) -> &[ComparisonRow] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// The `n` largest speedups, largest first.
    pub fn best(&self, n: usize) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().rev().take(n)
    }

    /// Rows with `speedup >= threshold`, ascending.
    pub fn flagged(&self, threshold: f64) -> &[ComparisonRow] {
        let start = self.rows.partition_point(|r| r.speedup < threshold);
        &self.rows[start..]
    }

    /// Rows where either platform took longer than `seconds`.
    pub fn big(&self, seconds: f64) -> Vec<&ComparisonRow> {
        let mut rows: Vec<&ComparisonRow> = self
            .rows
            .iter()
            .filter(|r| r.cpu_time() > seconds || r.gpu_time() > seconds)
            .collect();
        rows.sort_by_key(|r| r.query_id);
        rows
    }

    /// Rows where the GPU is more than `slowdown` times slower than the CPU
    /// and took longer than `min_gpu_seconds`, mildest first.
    pub fn gpu_regressions(&self, slowdown: f64, min_gpu_seconds: f64) -> Vec<&ComparisonRow> {
        // Ascending speedup is descending slowdown.
        self.rows
            .iter()
            .filter(|r| r.gpu_time() / r.cpu_time() > slowdown && r.gpu_time() > min_gpu_seconds)
            .rev()
            .collect()
    }

    /// Totals, overall ratio and GPU win count.
    pub fn totals(&self) -> Totals {
        let cpu_time: f64 = self.rows_by_query().iter().map(|r| r.cpu_time()).sum();
        let gpu_time: f64 = self.rows_by_query().iter().map(|r| r.gpu_time()).sum();
        Totals {
            cpu_time,
            gpu_time,
            ratio: (gpu_time > 0.0).then(|| cpu_time / gpu_time),
            wins: self.rows.iter().filter(|r| r.gpu_wins()).count(),
            eligible: self.rows.len(),
        }
    }

    /// Arithmetic mean of the speedups.
    pub fn mean_speedup(&self) -> Option<f64> {
        if self.rows.is_empty() {
            return None;
        }
        Some(self.rows.iter().map(|r| r.speedup).sum::<f64>() / self.rows.len() as f64)
    }

    /// Speedup at index `len / 2` of the ascending ranking.
    pub fn median_speedup(&self) -> Option<f64> {
        self.rows.get(self.rows.len() / 2).map(|r| r.speedup)
    }

    /// Mean speedup over a slice of rows.
    pub fn average(rows: &[ComparisonRow]) -> Option<f64> {
        if rows.is_empty() {
            return None;
        }
        Some(rows.iter().map(|r| r.speedup).sum::<f64>() / rows.len() as f64)
    }

    /// Eligible-only time series over `universe` queries, zero elsewhere.
    pub fn series(&self, universe: u32) -> (TimeSeries, TimeSeries) {
        let mut cpu = vec![0.0; universe as usize];
        let mut gpu = vec![0.0; universe as usize];
        for r in &self.rows {
            let idx = (r.query_id - 1) as usize;
            if idx < cpu.len() {
                cpu[idx] = r.cpu_time();
                gpu[idx] = r.gpu_time();
            }
        }
        (
            TimeSeries::from_values(rpq_log::Platform::Cpu, cpu),
            TimeSeries::from_values(rpq_log::Platform::Gpu, gpu),
        )
    }
}
