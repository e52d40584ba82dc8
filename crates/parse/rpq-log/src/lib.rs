//! Parsers for RPQ benchmark logs.
//!
//! Reads the plain-text result files written by the CPU and GPU query
//! engines into typed [`QueryMeasurement`] records, and the per-query
//! `queries_logs/<id>.txt` files into [`QueryProfile`]s or, for engine
//! builds that log timings there, [`QueryTiming`]s.
//!
//! Time columns are converted to seconds while parsing, so every
//! [`QueryMeasurement`] carries seconds regardless of the source unit.

pub mod error;
pub mod measurement;
pub mod profile;
pub mod reader;
pub mod schema;
pub mod timing;

pub use error::{LineError, LogError, MalformedLineError, ProfileError};
pub use measurement::{Platform, QueryId, QueryMeasurement};
pub use profile::{MatrixShape, QueryProfile, profile_path};
pub use reader::{LogFile, parse_log, parse_log_bytes, read_log};
pub use schema::{AuxColumn, Columns, LineFormat, LineSchema, TimeUnit, UnknownOption};
pub use timing::QueryTiming;
