//! Per-platform time series indexed by query id.
//!
//! This is the raw data the chart renderer plots: one mean time per query
//! over a fixed universe, zero where a query has no summary.

use rpq_log::{Platform, QueryId};
use serde::Serialize;

use crate::aggregate::PlatformSummaries;
use crate::diagnostic::Diagnostic;

/// Mean times for queries `1..=universe`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    /// Platform the times belong to.
    pub platform: Platform,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Series of explicit values; `values[0]` is query 1.
    pub fn from_values(platform: Platform, values: Vec<f64>) -> Self {
        Self { platform, values }
    }

    /// Spread summaries over a universe of `universe` queries.
    ///
    /// With `universe = None` the largest summarized id sets the size. Ids
    /// beyond the universe are dropped with a [`Diagnostic::OutOfUniverse`].
    pub fn from_summaries(
        summaries: &PlatformSummaries,
        universe: Option<u32>,
    ) -> (Self, Vec<Diagnostic>) {
        let size = universe.unwrap_or_else(|| summaries.max_query_id().unwrap_or(0));
        let mut values = vec![0.0; size as usize];
        let mut diagnostics = Vec::new();

        for s in summaries.iter() {
            if s.query_id > size {
                let d = Diagnostic::OutOfUniverse {
                    platform: summaries.platform,
                    query_id: s.query_id,
                    universe: size,
                };
                d.emit();
                diagnostics.push(d);
                continue;
            }
            values[(s.query_id - 1) as usize] = s.mean_time;
        }

        (
            Self {
                platform: summaries.platform,
                values,
            },
            diagnostics,
        )
    }

    /// Number of queries covered.
    pub fn universe(&self) -> u32 {
        u32::try_from(self.values.len()).unwrap_or(u32::MAX)
    }

    /// Time for `query_id`, zero if absent or out of range.
    pub fn get(&self, query_id: QueryId) -> f64 {
        query_id
            .checked_sub(1)
            .and_then(|idx| self.values.get(idx as usize))
            .copied()
            .unwrap_or(0.0)
    }

    /// Raw values; index 0 is query 1.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Sum over all queries.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// `(query_id, time)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (QueryId, f64)> + '_ {
        (1..).zip(self.values.iter().copied())
    }

    /// Copy of both series with a query zeroed on both sides whenever either
    /// side is zero.
    pub fn masked(cpu: &Self, gpu: &Self) -> (Self, Self) {
        let len = cpu.values.len().max(gpu.values.len());
        let mut c = Vec::with_capacity(len);
        let mut g = Vec::with_capacity(len);
        for idx in 0..len {
            let cv = cpu.values.get(idx).copied().unwrap_or(0.0);
            let gv = gpu.values.get(idx).copied().unwrap_or(0.0);
            if cv == 0.0 || gv == 0.0 {
                c.push(0.0);
                g.push(0.0);
            } else {
                c.push(cv);
                g.push(gv);
            }
        }
        (
            Self::from_values(cpu.platform, c),
            Self::from_values(gpu.platform, g),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::QuerySummary;

    fn summaries(platform: Platform, times: &[(QueryId, f64)]) -> PlatformSummaries {
        let mut set = PlatformSummaries::new(platform);
        for &(query_id, mean_time) in times {
            set.insert(QuerySummary {
                query_id,
                mean_time,
                sample_std_dev: None,
                answer_count: None,
                runs: 1,
            });
        }
        set
    }

    #[test]
    fn spreads_over_fixed_universe() {
        let set = summaries(Platform::Cpu, &[(2, 1.5), (4, 2.5)]);
        let (series, diags) = TimeSeries::from_summaries(&set, Some(5));
        assert!(diags.is_empty());
        assert_eq!(series.values(), &[0.0, 1.5, 0.0, 2.5, 0.0]);
        assert_eq!(series.get(4), 2.5);
        assert_eq!(series.get(0), 0.0);
        assert_eq!(series.get(99), 0.0);
        assert_eq!(series.universe(), 5);
    }

    #[test]
    fn ids_beyond_universe_are_reported() {
        let set = summaries(Platform::Gpu, &[(1, 1.0), (7, 2.0)]);
        let (series, diags) = TimeSeries::from_summaries(&set, Some(3));
        assert_eq!(series.total(), 1.0);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].query_id(), Some(7));
    }

    #[test]
    fn masking_zeroes_both_sides() {
        let cpu = TimeSeries::from_values(Platform::Cpu, vec![2.0, 4.0, 0.0]);
        let gpu = TimeSeries::from_values(Platform::Gpu, vec![1.0, 0.0, 3.0]);
        let (c, g) = TimeSeries::masked(&cpu, &gpu);
        assert_eq!(c.values(), &[2.0, 0.0, 0.0]);
        assert_eq!(g.values(), &[1.0, 0.0, 0.0]);
    }
}
