//! Joining GPU summaries with per-query structural profiles.

use std::collections::BTreeSet;
use std::path::Path;

use rpq_log::{ProfileError, QueryId, QueryProfile, profile_path};
use serde::Serialize;

use crate::aggregate::PlatformSummaries;
use crate::diagnostic::Diagnostic;

/// A summarized query with its profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfiledQuery {
    /// Query index.
    pub query_id: QueryId,
    /// Mean execution time in seconds.
    pub execute_seconds: f64,
    /// Structural profile.
    pub profile: QueryProfile,
}

/// Profiled queries plus the ones that could not be enriched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Enrichment {
    /// Queries with a profile, in id order.
    pub queries: Vec<ProfiledQuery>,
    /// Missing or unreadable profiles.
    pub diagnostics: Vec<Diagnostic>,
}

/// Attach profiles from `queries_logs`-style directory `dir`.
pub fn enrich(summaries: &PlatformSummaries, dir: &Path) -> Result<Enrichment, ProfileError> {
    enrich_with(summaries, |query_id| QueryProfile::read(&profile_path(dir, query_id)))
}

/// Attach profiles obtained from `lookup`.
///
/// `Ok(None)` from the lookup means the profile is unavailable; the query is
/// skipped with [`Diagnostic::MissingProfile`]. Malformed profiles are
/// skipped with [`Diagnostic::MalformedProfile`]. I/O failures abort.
pub fn enrich_with<F>(summaries: &PlatformSummaries, mut lookup: F) -> Result<Enrichment, ProfileError>
where
    F: FnMut(QueryId) -> Result<Option<QueryProfile>, ProfileError>,
{
    let mut out = Enrichment::default();

    for s in summaries.iter() {
        let diagnostic = match lookup(s.query_id) {
            Ok(Some(profile)) => {
                out.queries.push(ProfiledQuery {
                    query_id: s.query_id,
                    execute_seconds: s.mean_time,
                    profile,
                });
                continue;
            }
            Ok(None) => Diagnostic::MissingProfile {
                query_id: s.query_id,
            },
            Err(e @ ProfileError::Io { .. }) => return Err(e),
            Err(e) => Diagnostic::MalformedProfile {
                query_id: s.query_id,
                message: e.to_string(),
            },
        };
        diagnostic.emit();
        out.diagnostics.push(diagnostic);
    }

    Ok(out)
}

impl Enrichment {
    fn points<F>(&self, min_time: Option<f64>, key: F) -> Vec<(u64, f64)>
    where
        F: Fn(&QueryProfile) -> Option<u64>,
    {
        let mut points: Vec<(u64, f64)> = self
            .queries
            .iter()
            .filter(|q| min_time.is_none_or(|min| q.execute_seconds > min))
            .filter_map(|q| key(&q.profile).map(|k| (k, q.execute_seconds)))
            .collect();
        points.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        points
    }

    /// `(values touched per iteration, execution time)`, sorted by the first.
    pub fn by_nvals(&self, min_time: Option<f64>) -> Vec<(u64, f64)> {
        self.points(min_time, |p| Some(p.nvals_total()))
    }

    /// `(iteration count, execution time)`, sorted by the first.
    pub fn by_iterations(&self, min_time: Option<f64>) -> Vec<(u64, f64)> {
        self.points(min_time, |p| Some(p.iteration_count))
    }

    /// `(multiplication count, execution time)` for profiles that log it.
    pub fn by_multiplications(&self, min_time: Option<f64>) -> Vec<(u64, f64)> {
        self.points(min_time, |p| p.multiplication_count)
    }

    /// Distinct matrix dimensions across all profiles.
    pub fn dimensions(&self) -> BTreeSet<u64> {
        self.queries
            .iter()
            .flat_map(|q| q.profile.dimensions())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::QuerySummary;
    use rpq_log::{MatrixShape, Platform};

    fn summaries() -> PlatformSummaries {
        let mut set = PlatformSummaries::new(Platform::Gpu);
        for (query_id, mean_time) in [(1, 0.5), (2, 2.0), (3, 1.0)] {
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

    fn profile(iterations: u64, muls: Option<u64>, nvals: &[u64]) -> QueryProfile {
        QueryProfile {
            iteration_count: iterations,
            multiplication_count: muls,
            matrices: nvals
                .iter()
                .map(|&nvals| MatrixShape {
                    nvals,
                    nrows: 10,
                    ncols: 20,
                })
                .collect(),
        }
    }

    #[test]
    fn missing_profiles_are_skipped() {
        let out = enrich_with(&summaries(), |id| {
            Ok(match id {
                1 => Some(profile(3, Some(9), &[5, 5])),
                3 => Some(profile(1, None, &[100])),
                _ => None,
            })
        })
        .unwrap();

        assert_eq!(out.queries.len(), 2);
        assert_eq!(out.diagnostics, vec![Diagnostic::MissingProfile { query_id: 2 }]);
        assert_eq!(out.by_nvals(None), vec![(10, 0.5), (100, 1.0)]);
        assert_eq!(out.by_iterations(Some(0.75)), vec![(1, 1.0)]);
        assert_eq!(out.by_multiplications(None), vec![(9, 0.5)]);
        assert_eq!(out.dimensions().into_iter().collect::<Vec<_>>(), vec![10, 20]);
    }

    #[test]
    fn malformed_profile_is_not_fatal() {
        let out = enrich_with(&summaries(), |id| {
            if id == 2 {
                Err(ProfileError::Empty)
            } else {
                Ok(Some(profile(1, None, &[1])))
            }
        })
        .unwrap();
        assert_eq!(out.queries.len(), 2);
        assert!(matches!(
            out.diagnostics[0],
            Diagnostic::MalformedProfile { query_id: 2, .. }
        ));
    }

    #[test]
    fn undecodable_profile_file_skips_only_its_query() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(profile_path(dir.path(), 1), "iterations=3\n10 100 100\n").unwrap();
        std::fs::write(profile_path(dir.path(), 2), b"iterations=\xff\n").unwrap();

        let out = enrich(&summaries(), dir.path()).unwrap();
        let ids: Vec<QueryId> = out.queries.iter().map(|q| q.query_id).collect();
        assert_eq!(ids, vec![1]);
        assert!(matches!(
            out.diagnostics[0],
            Diagnostic::MalformedProfile { query_id: 2, .. }
        ));
        assert_eq!(out.diagnostics[1], Diagnostic::MissingProfile { query_id: 3 });
    }
}
