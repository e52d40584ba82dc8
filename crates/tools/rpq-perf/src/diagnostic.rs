//! Non-fatal anomalies found while aggregating and comparing.
//!
//! Nothing here aborts a batch. Every diagnostic is returned to the caller,
//! which decides how to present it, and is traced at `TRACE` level.

use std::fmt;

use rpq_log::{MalformedLineError, Platform, QueryId};
use serde::Serialize;

/// A data-quality or correctness anomaly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A result line was skipped.
    MalformedLine {
        /// File the line came from.
        origin: String,
        /// 1-based line number.
        line_number: usize,
        /// Parser message.
        message: String,
    },
    /// A run recorded zero time for a query and was discarded.
    ZeroReading {
        /// Platform of the run.
        platform: Platform,
        /// Affected query.
        query_id: QueryId,
        /// 1-based run index.
        run: usize,
    },
    /// Repeated runs of one query disagree on the answer count.
    RunAnswerMismatch {
        /// Platform of the runs.
        platform: Platform,
        /// Affected query.
        query_id: QueryId,
        /// Distinct answer counts observed, in run order.
        counts: Vec<u64>,
    },
    /// CPU and GPU disagree on the answer count of an eligible query.
    AnswerMismatch {
        /// Affected query.
        query_id: QueryId,
        /// CPU answer count.
        cpu: u64,
        /// GPU answer count.
        gpu: u64,
    },
    /// No `queries_logs/<id>.txt` profile exists for a query.
    MissingProfile {
        /// Affected query.
        query_id: QueryId,
    },
    /// A profile exists but could not be parsed.
    MalformedProfile {
        /// Affected query.
        query_id: QueryId,
        /// Parser message.
        message: String,
    },
    /// A query id lies outside the configured query universe.
    OutOfUniverse {
        /// Platform of the summary.
        platform: Platform,
        /// Offending query id.
        query_id: QueryId,
        /// Universe size.
        universe: u32,
    },
}

impl Diagnostic {
    /// Build a diagnostic for a rejected result line.
    pub fn malformed_line(origin: &str, err: &MalformedLineError) -> Self {
        Self::MalformedLine {
            origin: origin.to_string(),
            line_number: err.line_number,
            message: err.kind.to_string(),
        }
    }

    /// Returns `true` for answer-count disagreements, which are always shown.
    pub fn is_answer_mismatch(&self) -> bool {
        matches!(
            self,
            Self::AnswerMismatch { .. } | Self::RunAnswerMismatch { .. }
        )
    }

    /// Query the diagnostic refers to, if any.
    pub fn query_id(&self) -> Option<QueryId> {
        match self {
            Self::MalformedLine { .. } => None,
            Self::ZeroReading { query_id, .. }
            | Self::RunAnswerMismatch { query_id, .. }
            | Self::AnswerMismatch { query_id, .. }
            | Self::MissingProfile { query_id }
            | Self::MalformedProfile { query_id, .. }
            | Self::OutOfUniverse { query_id, .. } => Some(*query_id),
        }
    }

    /// Record as a `tracing` event.
    pub(crate) fn emit(&self) {
        tracing::trace!(query = ?self.query_id(), "{}", self);
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine {
                origin,
                line_number,
                message,
            } => write!(f, "{origin}:{line_number}: skipped malformed line: {message}"),
            Self::ZeroReading {
                platform,
                query_id,
                run,
            } => write!(f, "query {query_id}: {platform} run {run} recorded zero time, discarded"),
            Self::RunAnswerMismatch {
                platform,
                query_id,
                counts,
            } => write!(
                f,
                "query {query_id}: {platform} runs disagree on answer count {counts:?}"
            ),
            Self::AnswerMismatch { query_id, cpu, gpu } => write!(
                f,
                "query {query_id}: answer mismatch (CPU {cpu}, GPU {gpu})"
            ),
            Self::MissingProfile { query_id } => {
                write!(f, "query {query_id}: profile unavailable")
            }
            Self::MalformedProfile { query_id, message } => {
                write!(f, "query {query_id}: unreadable profile: {message}")
            }
            Self::OutOfUniverse {
                platform,
                query_id,
                universe,
            } => write!(
                f,
                "query {query_id}: {platform} id outside universe of {universe} queries"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_mismatch_message() {
        let d = Diagnostic::AnswerMismatch {
            query_id: 4,
            cpu: 5,
            gpu: 7,
        };
        assert!(d.is_answer_mismatch());
        assert_eq!(d.query_id(), Some(4));
        assert_eq!(d.to_string(), "query 4: answer mismatch (CPU 5, GPU 7)");
    }

    #[test]
    fn serializes_with_kind_tag() {
        let d = Diagnostic::MissingProfile { query_id: 9 };
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"kind":"missing_profile","query_id":9}"#);
    }
}
