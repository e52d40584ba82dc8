//! Typed query measurements and the line parser that produces them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LineError;
use crate::schema::{AuxColumn, Columns, LineFormat, LineSchema};

/// 1-based query index into the benchmark suite.
pub type QueryId = u32;

/// Execution backend a measurement was taken on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Reference CPU engine.
    Cpu,
    /// GPU engine.
    Gpu,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("CPU"),
            Self::Gpu => f.write_str("GPU"),
        }
    }
}

/// One observation of one query on one platform in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMeasurement {
    /// Query index (positive).
    pub query_id: QueryId,
    /// Execution time in seconds.
    pub elapsed_seconds: f64,
    /// Number of answers, when the layout carries it.
    pub answer_count: Option<u64>,
    /// Query construction time in seconds (raw GPU runs).
    pub load_seconds: Option<f64>,
    /// Standard deviation column of an already aggregated result, in seconds.
    pub reported_error: Option<f64>,
}

impl QueryMeasurement {
    /// Parse one line according to `schema`.
    ///
    /// Returns `Ok(None)` for lines that carry no measurement: blank lines
    /// and, in annotated logs, lines without a `query` marker or for skipped
    /// queries.
    pub fn parse(line: &str, schema: &LineSchema) -> Result<Option<Self>, LineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        match schema.format {
            LineFormat::Annotated => parse_annotated(line, schema),
            LineFormat::SpaceDelimited | LineFormat::CommaDelimited => {
                parse_delimited(line, schema).map(Some)
            }
        }
    }

    /// Serialize back to a line in `schema`'s field order.
    ///
    /// Annotated schemas are written as space-delimited lines, since the
    /// console labels are not preserved.
    pub fn to_line(&self, schema: &LineSchema) -> String {
        let unit = schema.time_unit;
        let mut fields = vec![
            self.query_id.to_string(),
            unit.from_seconds(self.elapsed_seconds).to_string(),
        ];
        if schema.columns == Columns::IdTimeAuxAnswers {
            let aux = match schema.aux {
                AuxColumn::StdDev => self.reported_error,
                AuxColumn::LoadTime => self.load_seconds,
            };
            fields.push(unit.from_seconds(aux.unwrap_or(0.0)).to_string());
        }
        if schema.columns != Columns::IdTime {
            fields.push(self.answer_count.unwrap_or(0).to_string());
        }
        fields.join(schema.format.separator())
    }
}

fn parse_delimited(line: &str, schema: &LineSchema) -> Result<QueryMeasurement, LineError> {
    let fields = schema.format.split(line);
    let expected = schema.columns.field_count();
    if fields.len() != expected {
        return Err(LineError::FieldCount {
            expected,
            found: fields.len(),
        });
    }

    let query_id = parse_query_id(fields[0])?;
    let elapsed_seconds = schema.time_unit.to_seconds(parse_time("elapsed", fields[1])?);

    let mut measurement = QueryMeasurement {
        query_id,
        elapsed_seconds,
        answer_count: None,
        load_seconds: None,
        reported_error: None,
    };

    match schema.columns {
        Columns::IdTimeAuxAnswers => {
            let aux = schema.time_unit.to_seconds(parse_time("aux", fields[2])?);
            match schema.aux {
                AuxColumn::StdDev => measurement.reported_error = Some(aux),
                AuxColumn::LoadTime => measurement.load_seconds = Some(aux),
            }
            measurement.answer_count = Some(parse_count(fields[3])?);
        }
        Columns::IdTimeAnswers => {
            measurement.answer_count = Some(parse_count(fields[2])?);
        }
        Columns::IdTime => {}
    }

    Ok(measurement)
}

/// `query #<id>; <label>: <load>, <label>: <exec>[, <label>: <answers>]`
fn parse_annotated(line: &str, schema: &LineSchema) -> Result<Option<QueryMeasurement>, LineError> {
    if !line.contains("query") || line.contains("skipped") {
        return Ok(None);
    }

    let (head, body) = line.split_once(';').ok_or(LineError::MissingMarker(";"))?;
    let (_, id) = head.split_once('#').ok_or(LineError::MissingMarker("#"))?;
    let query_id = parse_query_id(id.trim())?;

    let parts: Vec<&str> = body.split(',').collect();
    if parts.len() < 2 {
        return Err(LineError::FieldCount {
            expected: 2,
            found: parts.len(),
        });
    }

    let load = labelled_value(parts[0])?;
    let exec = labelled_value(parts[1])?;
    let load_seconds = schema.time_unit.to_seconds(parse_time("load", load)?);
    let elapsed_seconds = schema.time_unit.to_seconds(parse_time("exec", exec)?);

    let answer_count = match parts.get(2) {
        Some(part) => Some(parse_count(labelled_value(part)?)?),
        None => None,
    };

    Ok(Some(QueryMeasurement {
        query_id,
        elapsed_seconds,
        answer_count,
        load_seconds: Some(load_seconds),
        reported_error: None,
    }))
}

fn labelled_value(part: &str) -> Result<&str, LineError> {
    part.rsplit_once(':')
        .map(|(_, value)| value.trim())
        .ok_or(LineError::MissingMarker(":"))
}

fn parse_query_id(token: &str) -> Result<u32, LineError> {
    let id: u32 = token.parse().map_err(|_| LineError::InvalidNumber {
        field: "query_id",
        token: token.to_string(),
    })?;
    if id == 0 {
        return Err(LineError::ZeroQueryId);
    }
    Ok(id)
}

fn parse_time(field: &'static str, token: &str) -> Result<f64, LineError> {
    let value: f64 = token.parse().map_err(|_| LineError::InvalidNumber {
        field,
        token: token.to_string(),
    })?;
    if !value.is_finite() || value < 0.0 {
        return Err(LineError::InvalidTime { field, value });
    }
    Ok(value)
}

fn parse_count(token: &str) -> Result<u64, LineError> {
    token.parse().map_err(|_| LineError::InvalidNumber {
        field: "answer_count",
        token: token.to_string(),
    })
}
