//! Query construction (load) versus execution time on the GPU.
//!
//! Raw GPU run files, or the first line of each `queries_logs/<id>.txt`,
//! record how long building the query matrices took next to the execution
//! time. A query whose load time reaches its execution time is worth a
//! manual look.

use std::collections::BTreeMap;
use std::path::Path;

use rpq_log::{ProfileError, QueryId, QueryMeasurement, QueryTiming, profile_path};
use serde::Serialize;

use crate::diagnostic::Diagnostic;

/// Load/execute ratio at or above which a query is suspicious.
pub const SUSPICIOUS_LOAD_RATIO: f64 = 1.0;

/// Mean load and execution time of one query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadTiming {
    /// Query index.
    pub query_id: QueryId,
    /// Mean load time in seconds.
    pub load_seconds: f64,
    /// Mean execution time in seconds.
    pub execute_seconds: f64,
}

impl LoadTiming {
    /// `load / execute`, if the execution time is non-zero.
    pub fn ratio(&self) -> Option<f64> {
        (self.execute_seconds > 0.0).then(|| self.load_seconds / self.execute_seconds)
    }
}

/// Load timings of every query that reported one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadAnalysis {
    timings: Vec<LoadTiming>,
}

impl LoadAnalysis {
    /// Average the load and execution times per query.
    ///
    /// Measurements without a load column are ignored.
    pub fn from_measurements<'a>(measurements: impl IntoIterator<Item = &'a QueryMeasurement>) -> Self {
        let mut sums: BTreeMap<QueryId, (f64, f64, u32)> = BTreeMap::new();
        for m in measurements {
            let Some(load) = m.load_seconds else {
                continue;
            };
            let entry = sums.entry(m.query_id).or_insert((0.0, 0.0, 0));
            entry.0 += load;
            entry.1 += m.elapsed_seconds;
            entry.2 += 1;
        }

        let timings = sums
            .into_iter()
            .map(|(query_id, (load, exec, n))| LoadTiming {
                query_id,
                load_seconds: load / f64::from(n),
                execute_seconds: exec / f64::from(n),
            })
            .collect();
        Self { timings }
    }

    /// Read `load=<s>,exec=<s>` timings from `dir/<id>.txt` for queries
    /// `1..=universe`.
    pub fn from_logs(dir: &Path, universe: QueryId) -> Result<(Self, Vec<Diagnostic>), ProfileError> {
        Self::from_logs_with(universe, |query_id| QueryTiming::read(&profile_path(dir, query_id)))
    }

    /// Collect timings from `lookup` for queries `1..=universe`.
    ///
    /// Absent logs are skipped. Malformed ones are skipped with
    /// [`Diagnostic::MalformedProfile`]; I/O failures abort.
    pub fn from_logs_with<F>(universe: QueryId, mut lookup: F) -> Result<(Self, Vec<Diagnostic>), ProfileError>
    where
        F: FnMut(QueryId) -> Result<Option<QueryTiming>, ProfileError>,
    {
        let mut timings = Vec::new();
        let mut diagnostics = Vec::new();

        for query_id in 1..=universe {
            match lookup(query_id) {
                Ok(Some(t)) => timings.push(LoadTiming {
                    query_id,
                    load_seconds: t.load_seconds,
                    execute_seconds: t.execute_seconds,
                }),
                Ok(None) => {}
                Err(e @ ProfileError::Io { .. }) => return Err(e),
                Err(e) => {
                    let d = Diagnostic::MalformedProfile {
                        query_id,
                        message: e.to_string(),
                    };
                    d.emit();
                    diagnostics.push(d);
                }
            }
        }

        Ok((Self { timings }, diagnostics))
    }

    /// Timings in query id order.
    pub fn timings(&self) -> &[LoadTiming] {
        &self.timings
    }

    /// Number of queries with load timings.
    pub fn len(&self) -> usize {
        self.timings.len()
    }

    /// Returns `true` if no query reported a load time.
    pub fn is_empty(&self) -> bool {
        self.timings.is_empty()
    }

    /// Sum of load times.
    pub fn total_load(&self) -> f64 {
        self.timings.iter().map(|t| t.load_seconds).sum()
    }

    /// Sum of execution times.
    pub fn total_execute(&self) -> f64 {
        self.timings.iter().map(|t| t.execute_seconds).sum()
    }

    /// `(query, load / execute)` pairs, largest ratio first.
    pub fn ratios(&self) -> Vec<(QueryId, f64)> {
        let mut ratios: Vec<(QueryId, f64)> = self
            .timings
            .iter()
            .filter_map(|t| t.ratio().map(|r| (t.query_id, r)))
            .collect();
        ratios.sort_by(|a, b| b.1.total_cmp(&a.1));
        ratios
    }

    /// Ratios at or above `threshold`, largest first.
    pub fn suspicious(&self, threshold: f64) -> Vec<(QueryId, f64)> {
        self.ratios()
            .into_iter()
            .filter(|&(_, r)| r >= threshold)
            .collect()
    }

    /// The `n` fastest executions.
    pub fn fastest(&self, n: usize) -> Vec<LoadTiming> {
        let mut sorted = self.timings.clone();
        sorted.sort_by(|a, b| a.execute_seconds.total_cmp(&b.execute_seconds));
        sorted.truncate(n);
        sorted
    }

    /// Timings whose execution time is at most `max_execute` seconds.
    pub fn at_most(&self, max_execute: f64) -> Vec<LoadTiming> {
        self.timings
            .iter()
            .filter(|t| t.execute_seconds <= max_execute)
            .copied()
            .collect()
    }
}
