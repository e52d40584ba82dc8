//! Load and execution times from the first line of a query log.
//!
//! Some engine builds open `queries_logs/<id>.txt` with
//!
//! ```text
//! load=<seconds>,exec=<seconds>
//! ```
//!
//! instead of the structural profile. Only the first line is read.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::profile::read_query_log;

/// Query construction and execution time logged by the GPU engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryTiming {
    /// Time spent building the query matrices, in seconds.
    pub load_seconds: f64,
    /// Execution time in seconds.
    pub execute_seconds: f64,
}

impl QueryTiming {
    /// Parse the text of a query log.
    pub fn parse(text: &str) -> Result<Self, ProfileError> {
        let first = text
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or(ProfileError::Empty)?;

        let fields: Vec<&str> = first.split(',').collect();
        let [load, exec] = fields.as_slice() else {
            return Err(malformed(format!(
                "expected load=<s>,exec=<s>, found {first:?}"
            )));
        };
        Ok(Self {
            load_seconds: seconds(load)?,
            execute_seconds: seconds(exec)?,
        })
    }

    /// Read a query log. `Ok(None)` if the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, ProfileError> {
        match read_query_log(path)? {
            Some(text) => Self::parse(&text).map(Some),
            None => Ok(None),
        }
    }
}

fn seconds(field: &str) -> Result<f64, ProfileError> {
    let (_, value) = field
        .split_once('=')
        .ok_or_else(|| malformed(format!("expected key=value, found {field:?}")))?;
    let value = value.trim();
    match value.parse::<f64>() {
        Ok(s) if s.is_finite() && s >= 0.0 => Ok(s),
        _ => Err(malformed(format!("{value:?} is not a non-negative time"))),
    }
}

fn malformed(reason: String) -> ProfileError {
    ProfileError::Malformed {
        line_number: 1,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::profile_path;

    #[test]
    fn parses_first_line_only() {
        let t = QueryTiming::parse("load=0.25,exec=0.5\n10 100 100\n").unwrap();
        assert_eq!(t.load_seconds, 0.25);
        assert_eq!(t.execute_seconds, 0.5);
    }

    #[test]
    fn rejects_other_layouts() {
        assert!(matches!(QueryTiming::parse(""), Err(ProfileError::Empty)));
        for text in ["iterations=4\n", "load=1;exec=2\n", "load=x,exec=1\n", "load=-1,exec=1\n"] {
            assert!(
                matches!(
                    QueryTiming::parse(text),
                    Err(ProfileError::Malformed { line_number: 1, .. })
                ),
                "{text:?}"
            );
        }
    }

    #[test]
    fn absent_log_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(QueryTiming::read(&profile_path(dir.path(), 3)).unwrap(), None);
    }
}
