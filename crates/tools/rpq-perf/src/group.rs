//! Grouping of queries into fixed-size query types.
//!
//! The benchmark suites generate queries type by type, so ids
//! `1..=per_type` are type 1, the next `per_type` ids type 2, and so on.

use std::ops::RangeInclusive;

use rpq_log::QueryId;
use serde::{Deserialize, Serialize};

use crate::series::TimeSeries;

/// Layout of query types over the query universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryTypes {
    /// Number of types.
    pub type_count: u32,
    /// Queries per type.
    pub per_type: u32,
}

impl QueryTypes {
    /// `type_count` types of `per_type` queries each.
    pub fn new(type_count: u32, per_type: u32) -> Self {
        Self {
            type_count,
            per_type,
        }
    }

    /// Like [`QueryTypes::new`], but `None` if `per_type` is zero or the
    /// covered ids do not fit in a [`QueryId`].
    pub fn checked(type_count: u32, per_type: u32) -> Option<Self> {
        if per_type == 0 {
            return None;
        }
        type_count
            .checked_mul(per_type)
            .map(|_| Self::new(type_count, per_type))
    }

    /// Enough types of `per_type` queries to cover `universe` queries.
    pub fn covering(universe: u32, per_type: u32) -> Self {
        let per_type = per_type.max(1);
        Self::new(universe.div_ceil(per_type), per_type)
    }

    /// Total number of queries covered.
    pub fn universe(self) -> u32 {
        self.type_count.saturating_mul(self.per_type)
    }

    /// 1-based type of `query_id`, if inside the universe.
    pub fn type_of(self, query_id: QueryId) -> Option<u32> {
        if query_id == 0 || self.per_type == 0 {
            return None;
        }
        let ty = (query_id - 1) / self.per_type + 1;
        (ty <= self.type_count).then_some(ty)
    }

    /// Query ids belonging to 1-based type `query_type`, clamped to the
    /// largest [`QueryId`].
    pub fn range(self, query_type: u32) -> RangeInclusive<QueryId> {
        let first = query_type
            .saturating_sub(1)
            .saturating_mul(self.per_type)
            .saturating_add(1);
        first..=first.saturating_add(self.per_type.saturating_sub(1))
    }
}

/// Summed times of one query type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeAggregate {
    /// 1-based type index.
    pub query_type: u32,
    /// First query id of the type.
    pub first_query: QueryId,
    /// Last query id of the type.
    pub last_query: QueryId,
    /// Sum of CPU times.
    pub cpu_time: f64,
    /// Sum of GPU times.
    pub gpu_time: f64,
}

impl TypeAggregate {
    /// `cpu_time / gpu_time`, if the GPU sum is non-zero.
    pub fn speedup(&self) -> Option<f64> {
        (self.gpu_time > 0.0).then(|| self.cpu_time / self.gpu_time)
    }
}

/// Sum both series per query type, skipping the 1-based types in `exclude`.
///
/// Without exclusions the per-type sums add up to the series totals over
/// the covered universe.
pub fn group_by_type(
    types: QueryTypes,
    cpu: &TimeSeries,
    gpu: &TimeSeries,
    exclude: &[u32],
) -> Vec<TypeAggregate> {
    (1..=types.type_count)
        .filter(|ty| !exclude.contains(ty))
        .map(|query_type| {
            let ids = types.range(query_type);
            TypeAggregate {
                query_type,
                first_query: *ids.start(),
                last_query: *ids.end(),
                cpu_time: ids.clone().map(|id| cpu.get(id)).sum(),
                gpu_time: ids.map(|id| gpu.get(id)).sum(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpq_log::Platform;

    #[test]
    fn type_ranges() {
        let types = QueryTypes::new(20, 100);
        assert_eq!(types.universe(), 2000);
        assert_eq!(types.type_of(1), Some(1));
        assert_eq!(types.type_of(100), Some(1));
        assert_eq!(types.type_of(101), Some(2));
        assert_eq!(types.type_of(2000), Some(20));
        assert_eq!(types.type_of(2001), None);
        assert_eq!(types.type_of(0), None);
        assert_eq!(types.range(11), 1001..=1100);
    }

    #[test]
    fn oversized_layouts_do_not_overflow() {
        assert_eq!(QueryTypes::checked(20, 100), Some(QueryTypes::new(20, 100)));
        assert_eq!(QueryTypes::checked(70_000, 70_000), None);
        assert_eq!(QueryTypes::checked(3, 0), None);

        let huge = QueryTypes::new(70_000, 70_000);
        assert_eq!(huge.universe(), u32::MAX);
        assert_eq!(*huge.range(70_000).end(), u32::MAX);
        assert_eq!(huge.type_of(u32::MAX), Some(61_357));
    }

    #[test]
    fn covering_rounds_up() {
        assert_eq!(QueryTypes::covering(660, 100), QueryTypes::new(7, 100));
        assert_eq!(QueryTypes::covering(2000, 100), QueryTypes::new(20, 100));
    }

    #[test]
    fn exclusion_list_drops_types() {
        let cpu = TimeSeries::from_values(Platform::Cpu, vec![1.0; 6]);
        let gpu = TimeSeries::from_values(Platform::Gpu, vec![0.5; 6]);
        let groups = group_by_type(QueryTypes::new(3, 2), &cpu, &gpu, &[2]);
        let kept: Vec<u32> = groups.iter().map(|g| g.query_type).collect();
        assert_eq!(kept, vec![1, 3]);
        assert_eq!(groups[1].first_query, 5);
        assert_eq!(groups[1].cpu_time, 2.0);
        assert_eq!(groups[1].speedup(), Some(2.0));
    }
}
