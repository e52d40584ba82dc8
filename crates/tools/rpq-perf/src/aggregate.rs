//! Reduction of repeated runs to per-query summaries.

use std::collections::BTreeMap;

use rpq_log::{Platform, QueryId, QueryMeasurement};
use serde::{Deserialize, Serialize};

use crate::diagnostic::Diagnostic;

/// Aggregate of all runs of one query on one platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    /// Query index.
    pub query_id: QueryId,
    /// Arithmetic mean of the non-zero run times, in seconds.
    pub mean_time: f64,
    /// Bessel-corrected standard deviation; `None` with a single run.
    pub sample_std_dev: Option<f64>,
    /// Answer count of the first run that reported one.
    pub answer_count: Option<u64>,
    /// Number of runs that contributed.
    pub runs: usize,
}

impl QuerySummary {
    /// Standard deviation, with an unavailable value read as zero.
    pub fn std_dev_or_zero(&self) -> f64 {
        self.sample_std_dev.unwrap_or(0.0)
    }

    /// `sample_std_dev / mean_time`, when both are meaningful.
    pub fn relative_error(&self) -> Option<f64> {
        let sd = self.sample_std_dev?;
        (self.mean_time > 0.0).then(|| sd / self.mean_time)
    }
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Sample standard deviation with an N−1 denominator.
///
/// `None` for fewer than two samples.
pub fn sample_std_dev(samples: &[f64]) -> Option<f64> {
    let n = samples.len();
    if n < 2 {
        return None;
    }
    let m = mean(samples)?;
    let var_sum: f64 = samples.iter().map(|&s| (s - m) * (s - m)).sum();
    Some((var_sum / (n - 1) as f64).sqrt())
}

/// Result of reducing one query's runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// The summary, absent if no run had a non-zero time.
    pub summary: Option<QuerySummary>,
    /// Anomalies found in the runs.
    pub diagnostics: Vec<Diagnostic>,
}

/// Reduce the runs of one query on one platform, in run order.
///
/// Zero-time runs are discarded with a [`Diagnostic::ZeroReading`].
/// Disagreeing answer counts produce a [`Diagnostic::RunAnswerMismatch`];
/// the first run's count is kept.
pub fn summarize(platform: Platform, query_id: QueryId, runs: &[QueryMeasurement]) -> Aggregate {
    summarize_numbered(platform, query_id, runs.iter().enumerate().map(|(idx, m)| (idx + 1, m)))
}

/// [`summarize`] over measurements tagged with their 1-based run file number.
fn summarize_numbered<'a, I>(platform: Platform, query_id: QueryId, runs: I) -> Aggregate
where
    I: IntoIterator<Item = (usize, &'a QueryMeasurement)>,
{
    let mut diagnostics = Vec::new();
    let mut times = Vec::new();
    let mut counts: Vec<u64> = Vec::new();

    for (run, m) in runs {
        if m.elapsed_seconds == 0.0 {
            diagnostics.push(Diagnostic::ZeroReading {
                platform,
                query_id,
                run,
            });
            continue;
        }
        times.push(m.elapsed_seconds);
        if let Some(c) = m.answer_count {
            if !counts.contains(&c) {
                counts.push(c);
            }
        }
    }

    if counts.len() > 1 {
        diagnostics.push(Diagnostic::RunAnswerMismatch {
            platform,
            query_id,
            counts: counts.clone(),
        });
    }

    let summary = mean(&times).map(|mean_time| QuerySummary {
        query_id,
        mean_time,
        sample_std_dev: sample_std_dev(&times),
        answer_count: counts.first().copied(),
        runs: times.len(),
    });

    for d in &diagnostics {
        d.emit();
    }

    Aggregate {
        summary,
        diagnostics,
    }
}

/// Summaries of every query measured on one platform, keyed by query id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSummaries {
    /// Platform the summaries belong to.
    pub platform: Platform,
    summaries: BTreeMap<QueryId, QuerySummary>,
}

impl PlatformSummaries {
    /// An empty set.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            summaries: BTreeMap::new(),
        }
    }

    /// Build summaries from an already aggregated result file.
    ///
    /// The file's std-dev column becomes the sample standard deviation and
    /// zero times are kept, so the comparator can report why the query was
    /// excluded. A repeated id replaces the earlier line.
    pub fn from_reported(platform: Platform, measurements: &[QueryMeasurement]) -> Self {
        let mut set = Self::new(platform);
        for m in measurements {
            set.insert(QuerySummary {
                query_id: m.query_id,
                mean_time: m.elapsed_seconds,
                sample_std_dev: m.reported_error,
                answer_count: m.answer_count,
                runs: 1,
            });
        }
        set
    }

    /// Insert or replace a summary.
    pub fn insert(&mut self, summary: QuerySummary) {
        self.summaries.insert(summary.query_id, summary);
    }

    /// Summary for `query_id`.
    pub fn get(&self, query_id: QueryId) -> Option<&QuerySummary> {
        self.summaries.get(&query_id)
    }

    /// Number of summarized queries.
    pub fn len(&self) -> usize {
        self.summaries.len()
    }

    /// Returns `true` if no query was summarized.
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }

    /// Summaries in ascending query id order.
    pub fn iter(&self) -> impl Iterator<Item = &QuerySummary> {
        self.summaries.values()
    }

    /// Query ids in ascending order.
    pub fn query_ids(&self) -> impl Iterator<Item = QueryId> + '_ {
        self.summaries.keys().copied()
    }

    /// Largest query id present.
    pub fn max_query_id(&self) -> Option<QueryId> {
        self.summaries.keys().next_back().copied()
    }

    /// Sum of mean times.
    pub fn total_time(&self) -> f64 {
        self.summaries.values().map(|s| s.mean_time).sum()
    }

    /// Queries ranked by relative error, largest first.
    pub fn by_relative_error(&self) -> Vec<(QueryId, f64)> {
        let mut ranked: Vec<(QueryId, f64)> = self
            .summaries
            .values()
            .filter_map(|s| s.relative_error().map(|e| (s.query_id, e)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Summaries plus the anomalies found while building them.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    /// Per-query summaries.
    pub summaries: PlatformSummaries,
    /// Anomalies, in query order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Aggregate repeated runs of a whole benchmark on one platform.
///
/// Each element of `runs` is the parsed content of one run file. A query
/// missing from some runs is summarized over the runs that contain it.
pub fn aggregate_runs(platform: Platform, runs: &[Vec<QueryMeasurement>]) -> Aggregated {
    let mut by_query: BTreeMap<QueryId, Vec<(usize, &QueryMeasurement)>> = BTreeMap::new();
    for (idx, run) in runs.iter().enumerate() {
        for m in run {
            by_query.entry(m.query_id).or_default().push((idx + 1, m));
        }
    }

    let mut summaries = PlatformSummaries::new(platform);
    let mut diagnostics = Vec::new();
    for (query_id, samples) in by_query {
        let agg = summarize_numbered(platform, query_id, samples);
        if let Some(summary) = agg.summary {
            summaries.insert(summary);
        }
        diagnostics.extend(agg.diagnostics);
    }

    tracing::debug!(
        %platform,
        runs = runs.len(),
        queries = summaries.len(),
        "aggregated runs"
    );

    Aggregated {
        summaries,
        diagnostics,
    }
}
