//! Line schemas for benchmark result files.
//!
//! Two delimiter conventions appear in the benchmark data: whitespace
//! separated GPU `result.txt` files and comma separated CPU `all.txt`
//! files. Older GPU console logs use an annotated `query #N; ...` form.
//! A [`LineSchema`] pins down the delimiter, the column layout, the unit of
//! the time columns and the meaning of the auxiliary column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Microseconds per second, for [`TimeUnit::Microseconds`] inputs.
const MICROS_SCALE: f64 = 1e-6;

/// Field separator convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineFormat {
    /// Fields separated by runs of whitespace.
    SpaceDelimited,
    /// Fields separated by single commas.
    CommaDelimited,
    /// `query #<id>; <label>: <load>, <label>: <exec>, <label>: <answers>`.
    Annotated,
}

impl LineFormat {
    /// Split a delimited line into trimmed fields.
    ///
    /// Annotated lines have their own grammar and are returned as a single
    /// field.
    pub(crate) fn split(self, line: &str) -> Vec<&str> {
        match self {
            Self::SpaceDelimited => line.split_whitespace().collect(),
            Self::CommaDelimited => line.split(',').map(str::trim).collect(),
            Self::Annotated => vec![line.trim()],
        }
    }

    /// Separator used when writing a line back out.
    pub(crate) fn separator(self) -> &'static str {
        match self {
            Self::CommaDelimited => ",",
            Self::SpaceDelimited | Self::Annotated => " ",
        }
    }
}

impl fmt::Display for LineFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SpaceDelimited => "space_delimited",
            Self::CommaDelimited => "comma_delimited",
            Self::Annotated => "annotated",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing a schema option from a string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {expected})")]
pub struct UnknownOption {
    kind: &'static str,
    value: String,
    expected: &'static str,
}

impl FromStr for LineFormat {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "space" | "space_delimited" | "space-delimited" => Ok(Self::SpaceDelimited),
            "comma" | "comma_delimited" | "comma-delimited" => Ok(Self::CommaDelimited),
            "annotated" => Ok(Self::Annotated),
            other => Err(UnknownOption {
                kind: "line format",
                value: other.to_string(),
                expected: "space_delimited, comma_delimited, annotated",
            }),
        }
    }
}

/// Column layout of a delimited line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Columns {
    /// `<id> <time> <aux> <answers>`.
    IdTimeAuxAnswers,
    /// `<id> <time> <answers>`.
    IdTimeAnswers,
    /// `<id> <time>`.
    IdTime,
}

impl Columns {
    /// Number of fields a line must have.
    pub const fn field_count(self) -> usize {
        match self {
            Self::IdTimeAuxAnswers => 4,
            Self::IdTimeAnswers => 3,
            Self::IdTime => 2,
        }
    }
}

impl FromStr for Columns {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id_time_aux_answers" | "4" => Ok(Self::IdTimeAuxAnswers),
            "id_time_answers" | "3" => Ok(Self::IdTimeAnswers),
            "id_time" | "2" => Ok(Self::IdTime),
            other => Err(UnknownOption {
                kind: "column layout",
                value: other.to_string(),
                expected: "id_time_aux_answers, id_time_answers, id_time",
            }),
        }
    }
}

/// Meaning of the third column in [`Columns::IdTimeAuxAnswers`] lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxColumn {
    /// Standard deviation of an already aggregated result.
    StdDev,
    /// Query construction (load) time of a raw per-run result.
    LoadTime,
}

impl FromStr for AuxColumn {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "std_dev" | "stddev" => Ok(Self::StdDev),
            "load_time" | "load" => Ok(Self::LoadTime),
            other => Err(UnknownOption {
                kind: "aux column",
                value: other.to_string(),
                expected: "std_dev, load_time",
            }),
        }
    }
}

/// Unit of the time columns in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Seconds; no conversion.
    Seconds,
    /// Integer or fractional microseconds; scaled by 10⁻⁶.
    Microseconds,
}

impl TimeUnit {
    /// Convert a raw column value to seconds.
    pub fn to_seconds(self, raw: f64) -> f64 {
        match self {
            Self::Seconds => raw,
            Self::Microseconds => raw * MICROS_SCALE,
        }
    }

    /// Convert seconds back to this unit for serialization.
    pub fn from_seconds(self, seconds: f64) -> f64 {
        match self {
            Self::Seconds => seconds,
            Self::Microseconds => seconds / MICROS_SCALE,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = UnknownOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s" | "sec" | "seconds" => Ok(Self::Seconds),
            "us" | "micros" | "microseconds" => Ok(Self::Microseconds),
            other => Err(UnknownOption {
                kind: "time unit",
                value: other.to_string(),
                expected: "seconds, microseconds",
            }),
        }
    }
}

/// Full description of how to read one result line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSchema {
    /// Delimiter convention.
    pub format: LineFormat,
    /// Column layout (ignored for [`LineFormat::Annotated`]).
    pub columns: Columns,
    /// Unit of the time columns.
    pub time_unit: TimeUnit,
    /// Meaning of the auxiliary column.
    pub aux: AuxColumn,
}

impl LineSchema {
    /// GPU `result.txt`: `<id> <seconds> <std_dev> <answers>`.
    pub const fn space_delimited() -> Self {
        Self {
            format: LineFormat::SpaceDelimited,
            columns: Columns::IdTimeAuxAnswers,
            time_unit: TimeUnit::Seconds,
            aux: AuxColumn::StdDev,
        }
    }

    /// CPU `all.txt`: `<id>,<microseconds>,<result_code>`.
    pub const fn comma_delimited() -> Self {
        Self {
            format: LineFormat::CommaDelimited,
            columns: Columns::IdTimeAnswers,
            time_unit: TimeUnit::Microseconds,
            aux: AuxColumn::StdDev,
        }
    }

    /// GPU console log: `query #<id>; load: <s>, exec: <s>, result: <n>`.
    pub const fn annotated() -> Self {
        Self {
            format: LineFormat::Annotated,
            columns: Columns::IdTimeAuxAnswers,
            time_unit: TimeUnit::Seconds,
            aux: AuxColumn::LoadTime,
        }
    }

    /// Default schema for a delimiter convention.
    pub const fn for_format(format: LineFormat) -> Self {
        match format {
            LineFormat::SpaceDelimited => Self::space_delimited(),
            LineFormat::CommaDelimited => Self::comma_delimited(),
            LineFormat::Annotated => Self::annotated(),
        }
    }

    /// Replace the column layout.
    #[must_use]
    pub const fn with_columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Replace the time unit.
    #[must_use]
    pub const fn with_time_unit(mut self, time_unit: TimeUnit) -> Self {
        self.time_unit = time_unit;
        self
    }

    /// Replace the auxiliary column meaning.
    #[must_use]
    pub const fn with_aux(mut self, aux: AuxColumn) -> Self {
        self.aux = aux;
        self
    }
}

impl Default for LineSchema {
    fn default() -> Self {
        Self::space_delimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microseconds_scale_to_seconds() {
        let secs = TimeUnit::Microseconds.to_seconds(1_500_000.0);
        assert!((secs - 1.5).abs() < 1e-12);
        assert_eq!(TimeUnit::Seconds.to_seconds(2.25), 2.25);
    }

    #[test]
    fn comma_split_trims_fields() {
        let fields = LineFormat::CommaDelimited.split("12, 3400 ,1");
        assert_eq!(fields, vec!["12", "3400", "1"]);
    }

    #[test]
    fn format_names_parse() {
        assert_eq!("comma".parse::<LineFormat>().unwrap(), LineFormat::CommaDelimited);
        assert_eq!(
            "space_delimited".parse::<LineFormat>().unwrap(),
            LineFormat::SpaceDelimited
        );
        assert!("tabs".parse::<LineFormat>().is_err());
    }

    #[test]
    fn builders_override_defaults() {
        let schema = LineSchema::comma_delimited()
            .with_columns(Columns::IdTime)
            .with_time_unit(TimeUnit::Seconds);
        assert_eq!(schema.format, LineFormat::CommaDelimited);
        assert_eq!(schema.columns.field_count(), 2);
        assert_eq!(schema.time_unit, TimeUnit::Seconds);
    }
}
