//! Statistics for CPU versus GPU RPQ benchmark results.
//!
//! Turns parsed [`rpq_log::QueryMeasurement`]s into per-query summaries,
//! joins the CPU and GPU summaries into a ranked [`compare::Comparison`],
//! groups queries into fixed-size types, and hands the result to a
//! [`report::ReportSink`] (derived text files, JSON, or terminal tables).
//!
//! Pipeline: measurements → [`aggregate`] → [`compare`] → [`group`] /
//! [`report`]. Side analyses: [`load`] (query construction versus execution
//! time) and [`enrich`] (per-query structural profiles).

pub mod aggregate;
pub mod compare;
pub mod diagnostic;
pub mod enrich;
pub mod group;
pub mod load;
pub mod output;
pub mod report;
pub mod series;

pub use aggregate::{Aggregated, PlatformSummaries, QuerySummary, aggregate_runs, summarize};
pub use compare::{Comparison, ComparisonRow, Eligibility, Exclusion, Totals};
pub use diagnostic::Diagnostic;
pub use group::{QueryTypes, TypeAggregate, group_by_type};
pub use series::TimeSeries;
