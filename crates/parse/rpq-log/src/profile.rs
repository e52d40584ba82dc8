//! Per-query structural profiles from `queries_logs/<id>.txt`.
//!
//! Layout:
//!
//! ```text
//! iterations=<iteration_count>
//! multiplications=<multiplication_count>   (optional)
//! <nvals> <nrows> <ncols>                  (one row per matrix)
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::measurement::QueryId;

/// Shape of one sparse matrix touched by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixShape {
    /// Stored (non-zero) values.
    pub nvals: u64,
    /// Row count.
    pub nrows: u64,
    /// Column count.
    pub ncols: u64,
}

/// Structural metadata recorded by the GPU engine for one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryProfile {
    /// Fixpoint iterations performed.
    pub iteration_count: u64,
    /// Matrix multiplications performed, when logged.
    pub multiplication_count: Option<u64>,
    /// Matrices in log order.
    pub matrices: Vec<MatrixShape>,
}

/// Path of the profile log for `query_id` inside `dir`.
pub fn profile_path(dir: &Path, query_id: QueryId) -> PathBuf {
    dir.join(format!("{query_id}.txt"))
}

impl QueryProfile {
    /// Parse the text of a profile log.
    pub fn parse(text: &str) -> Result<Self, ProfileError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .peekable();

        let (first_no, first) = lines.next().ok_or(ProfileError::Empty)?;
        let iteration_count = key_value(first_no, first)?;

        let multiplication_count = match lines.peek() {
            Some(&(no, line)) if line.contains('=') => {
                lines.next();
                Some(key_value(no, line)?)
            }
            _ => None,
        };

        let mut matrices = Vec::new();
        for (no, line) in lines {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                return Err(ProfileError::Malformed {
                    line_number: no,
                    reason: format!("expected 3 matrix fields, found {}", fields.len()),
                });
            }
            matrices.push(MatrixShape {
                nvals: count(no, fields[0])?,
                nrows: count(no, fields[1])?,
                ncols: count(no, fields[2])?,
            });
        }

        Ok(Self {
            iteration_count,
            multiplication_count,
            matrices,
        })
    }

    /// Read a profile log.
    ///
    /// Returns `Ok(None)` if the file does not exist: the profile is simply
    /// unavailable for that query. Text that is not valid UTF-8 is
    /// [`ProfileError::Malformed`].
    pub fn read(path: &Path) -> Result<Option<Self>, ProfileError> {
        match read_query_log(path)? {
            Some(text) => Self::parse(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Total stored values across all matrices (values touched per iteration).
    pub fn nvals_total(&self) -> u64 {
        self.matrices.iter().map(|m| m.nvals).sum()
    }

    /// Distinct row and column counts across all matrices.
    pub fn dimensions(&self) -> BTreeSet<u64> {
        self.matrices
            .iter()
            .flat_map(|m| [m.nrows, m.ncols])
            .collect()
    }
}

/// Read a `queries_logs/<id>.txt` file as text, `None` if it is absent.
pub(crate) fn read_query_log(path: &Path) -> Result<Option<String>, ProfileError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ProfileError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    String::from_utf8(bytes).map(Some).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        ProfileError::Malformed {
            line_number: valid.iter().filter(|&&b| b == b'\n').count() + 1,
            reason: "invalid UTF-8".to_string(),
        }
    })
}

fn key_value(line_number: usize, line: &str) -> Result<u64, ProfileError> {
    let (_, value) = line.rsplit_once('=').ok_or_else(|| ProfileError::Malformed {
        line_number,
        reason: format!("expected key=value, found {line:?}"),
    })?;
    count(line_number, value.trim())
}

fn count(line_number: usize, token: &str) -> Result<u64, ProfileError> {
    token.parse().map_err(|_| ProfileError::Malformed {
        line_number,
        reason: format!("{token:?} is not a non-negative integer"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile_with_multiplications() {
        let text = "iterations=4\nmultiplications=12\n10 100 100\n5 100 3\n";
        let p = QueryProfile::parse(text).unwrap();
        assert_eq!(p.iteration_count, 4);
        assert_eq!(p.multiplication_count, Some(12));
        assert_eq!(p.matrices.len(), 2);
        assert_eq!(p.nvals_total(), 15);
        assert_eq!(p.dimensions().into_iter().collect::<Vec<_>>(), vec![3, 100]);
    }

    #[test]
    fn multiplication_line_is_optional() {
        let p = QueryProfile::parse("iterations=2\n7 8 9\n").unwrap();
        assert_eq!(p.iteration_count, 2);
        assert_eq!(p.multiplication_count, None);
        assert_eq!(
            p.matrices,
            vec![MatrixShape {
                nvals: 7,
                nrows: 8,
                ncols: 9
            }]
        );
    }

    #[test]
    fn malformed_profiles() {
        assert!(matches!(QueryProfile::parse(""), Err(ProfileError::Empty)));
        assert!(matches!(
            QueryProfile::parse("iterations\n"),
            Err(ProfileError::Malformed { line_number: 1, .. })
        ));
        assert!(matches!(
            QueryProfile::parse("iterations=1\n1 2\n"),
            Err(ProfileError::Malformed { line_number: 2, .. })
        ));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = profile_path(dir.path(), 2);
        fs::write(&path, b"iterations=3\nmultiplications=\xff\n").unwrap();
        assert!(matches!(
            QueryProfile::read(&path),
            Err(ProfileError::Malformed { line_number: 2, .. })
        ));
    }

    #[test]
    fn missing_profile_is_unavailable() {
        let path = profile_path(Path::new("/nonexistent/queries_logs"), 7);
        assert!(path.ends_with("7.txt"));
        assert!(QueryProfile::read(&path).unwrap().is_none());
    }
}
