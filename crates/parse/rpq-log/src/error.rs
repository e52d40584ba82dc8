//! Error types for log and profile parsing.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a single result line could not be parsed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    /// The line has the wrong number of fields for the configured schema.
    #[error("expected {expected} fields, found {found}")]
    FieldCount {
        /// Fields required by the schema.
        expected: usize,
        /// Fields present on the line.
        found: usize,
    },
    /// A field is not a valid number.
    #[error("{field}: {token:?} is not a valid number")]
    InvalidNumber {
        /// Column name.
        field: &'static str,
        /// Offending token.
        token: String,
    },
    /// A time column is negative, NaN or infinite.
    #[error("{field}: {value} is not a finite non-negative time")]
    InvalidTime {
        /// Column name.
        field: &'static str,
        /// Parsed value.
        value: f64,
    },
    /// Query ids are 1-based.
    #[error("query id must be positive")]
    ZeroQueryId,
    /// The line is not valid UTF-8.
    #[error("invalid UTF-8 at byte {offset}")]
    InvalidUtf8 {
        /// Length of the valid prefix.
        offset: usize,
    },
    /// An annotated log line lacks a required marker.
    #[error("missing `{0}` marker")]
    MissingMarker(&'static str),
}

/// A result line rejected by the parser.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line_number}: {kind} ({text:?})")]
pub struct MalformedLineError {
    /// 1-based line number within the file.
    pub line_number: usize,
    /// The raw line.
    pub text: String,
    /// What went wrong.
    #[source]
    pub kind: LineError,
}

/// Errors reading a whole log file.
#[derive(Debug, Error)]
pub enum LogError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Errors parsing a per-query profile log.
///
/// A missing profile file is not an error; see
/// [`QueryProfile::read`](crate::QueryProfile::read).
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The file exists but could not be read.
    #[error("failed to read profile {}: {source}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The file has no iteration count line.
    #[error("profile is empty")]
    Empty,
    /// A line does not follow the profile layout.
    #[error("profile line {line_number}: {reason}")]
    Malformed {
        /// 1-based line number.
        line_number: usize,
        /// Description of the problem.
        reason: String,
    },
}
