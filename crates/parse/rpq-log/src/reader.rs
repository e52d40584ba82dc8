//! Whole-file reading with skip-and-log handling of malformed lines.

use std::fs;
use std::path::Path;

use crate::error::{LineError, LogError, MalformedLineError};
use crate::measurement::QueryMeasurement;
use crate::schema::LineSchema;

/// Parsed contents of one result file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFile {
    /// Measurements in file order.
    pub measurements: Vec<QueryMeasurement>,
    /// Lines that could not be parsed.
    pub rejected: Vec<MalformedLineError>,
}

impl LogFile {
    /// Returns `true` if every non-blank line parsed.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Parse the text of a result file.
///
/// A malformed line is recorded in [`LogFile::rejected`] and parsing
/// continues with the next line.
pub fn parse_log(text: &str, schema: &LineSchema) -> LogFile {
    parse_log_bytes(text.as_bytes(), schema)
}

/// Parse the raw bytes of a result file.
///
/// Lines are decoded one at a time; a line that is not valid UTF-8 is
/// rejected with [`LineError::InvalidUtf8`] like any other malformed line.
pub fn parse_log_bytes(bytes: &[u8], schema: &LineSchema) -> LogFile {
    let mut file = LogFile::default();

    for (idx, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let parsed = match std::str::from_utf8(raw) {
            Ok(line) => QueryMeasurement::parse(line, schema),
            Err(e) => Err(LineError::InvalidUtf8 {
                offset: e.valid_up_to(),
            }),
        };
        match parsed {
            Ok(Some(m)) => file.measurements.push(m),
            Ok(None) => {}
            Err(kind) => {
                let err = MalformedLineError {
                    line_number: idx + 1,
                    text: String::from_utf8_lossy(raw).into_owned(),
                    kind,
                };
                tracing::trace!(line = err.line_number, error = %err.kind, "skipping malformed line");
                file.rejected.push(err);
            }
        }
    }

    file
}

/// Read and parse a result file.
pub fn read_log(path: impl AsRef<Path>, schema: &LineSchema) -> Result<LogFile, LogError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| LogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse_log_bytes(&bytes, schema);
    tracing::debug!(
        path = %path.display(),
        measurements = file.measurements.len(),
        rejected = file.rejected.len(),
        "parsed result file"
    );
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_line_does_not_stop_the_file() {
        let text = "1 0.5 0.01 3\n2 oops 0.01 3\n\n3 0.25 0.02 4\n";
        let file = parse_log(text, &LineSchema::space_delimited());
        assert_eq!(file.measurements.len(), 2);
        assert_eq!(file.measurements[1].query_id, 3);
        assert_eq!(file.rejected.len(), 1);
        assert_eq!(file.rejected[0].line_number, 2);
        assert!(matches!(file.rejected[0].kind, LineError::InvalidNumber { .. }));
        assert!(!file.is_clean());
    }

    #[test]
    fn invalid_utf8_rejects_only_its_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");
        fs::write(&path, b"1 0.5 0.01 3\n2 0.\xff5 0.01 3\r\n3 0.25 0.02 4\n").unwrap();

        let file = read_log(&path, &LineSchema::space_delimited()).unwrap();
        let ids: Vec<_> = file.measurements.iter().map(|m| m.query_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(file.rejected.len(), 1);
        assert_eq!(file.rejected[0].line_number, 2);
        assert_eq!(file.rejected[0].kind, LineError::InvalidUtf8 { offset: 4 });
        assert_eq!(file.rejected[0].text, "2 0.\u{fffd}5 0.01 3");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = read_log("/nonexistent/rpq/all.txt", &LineSchema::comma_delimited()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rpq/all.txt"));
    }
}
