//! Dataset configuration from `rpqstat.toml`.
//!
//! Every field is optional. Command-line flags override file values, and
//! file values override the built-in defaults. Relative paths in the file
//! are resolved against the directory containing it.
//!
//! ```toml
//! universe = 660
//! per_type = 100
//! exclude_types = [3]
//! profiles = "queries_logs"
//!
//! [cpu]
//! files = ["cpu/all.txt"]
//! format = "comma_delimited"
//!
//! [gpu]
//! files = ["gpu/result.txt"]
//!
//! [thresholds]
//! flag = 1.0
//! top = 5
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rpq_log::{AuxColumn, Columns, LineFormat, LineSchema, TimeUnit};
use serde::Deserialize;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "rpqstat.toml";

/// Default number of worst/best/top entries to print.
pub const DEFAULT_TOP: usize = 5;

/// Default queries per type.
pub const DEFAULT_PER_TYPE: u32 = 100;

/// Contents of a dataset file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// Number of queries in the suite.
    pub universe: Option<u32>,
    /// Queries per type.
    pub per_type: Option<u32>,
    /// Number of types.
    pub types: Option<u32>,
    /// 1-based types left out of the type table.
    pub exclude_types: Vec<u32>,
    /// Directory of per-query profile logs.
    pub profiles: Option<PathBuf>,
    /// CPU inputs.
    pub cpu: InputConfig,
    /// GPU inputs.
    pub gpu: InputConfig,
    /// Reporting thresholds.
    pub thresholds: Thresholds,
}

/// Files of one platform and how to read them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Result files; more than one is aggregated as runs.
    pub files: Vec<PathBuf>,
    /// Line format.
    pub format: Option<LineFormat>,
    /// Column layout.
    pub columns: Option<Columns>,
    /// Time unit.
    pub unit: Option<TimeUnit>,
    /// Meaning of the auxiliary column.
    pub aux: Option<AuxColumn>,
}

impl InputConfig {
    /// `self` with every unset field taken from `fallback`.
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            files: if self.files.is_empty() {
                fallback.files.clone()
            } else {
                self.files
            },
            format: self.format.or(fallback.format),
            columns: self.columns.or(fallback.columns),
            unit: self.unit.or(fallback.unit),
            aux: self.aux.or(fallback.aux),
        }
    }

    /// Schema built on `base`, or on the default schema of the configured
    /// format if one is set.
    pub fn schema(&self, base: LineSchema) -> LineSchema {
        let mut schema = self.format.map_or(base, LineSchema::for_format);
        if let Some(columns) = self.columns {
            schema = schema.with_columns(columns);
        }
        if let Some(unit) = self.unit {
            schema = schema.with_time_unit(unit);
        }
        if let Some(aux) = self.aux {
            schema = schema.with_aux(aux);
        }
        schema
    }
}

/// Reporting thresholds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Speedup at or above which a query is flagged.
    pub flag: Option<f64>,
    /// Seconds above which a query is big.
    pub big_seconds: Option<f64>,
    /// Load/execute ratio at or above which a query is suspicious.
    pub suspicious_load: Option<f64>,
    /// Number of worst/best/top entries to print.
    pub top: Option<usize>,
}

impl DatasetConfig {
    /// Load the dataset file.
    ///
    /// An explicit `path` must exist. Without one, `rpqstat.toml` in the
    /// working directory is used if present, and defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    tracing::debug!("no {DEFAULT_CONFIG_FILE}, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("parsing {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        tracing::debug!(path = %path.display(), "loaded dataset config");
        Ok(config)
    }

    /// Parse dataset TOML.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.cpu.files.iter_mut().for_each(resolve);
        self.gpu.files.iter_mut().for_each(resolve);
        if let Some(p) = self.profiles.as_mut() {
            resolve(p);
        }
    }

    /// Number of worst/best/top entries, with a flag override.
    pub fn top(&self, flag: Option<usize>) -> usize {
        flag.or(self.thresholds.top).unwrap_or(DEFAULT_TOP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(DatasetConfig::parse("").unwrap(), DatasetConfig::default());
    }

    #[test]
    fn parses_full_dataset() {
        let config = DatasetConfig::parse(
            r#"
            universe = 660
            per_type = 100
            exclude_types = [3, 5]

            [cpu]
            files = ["cpu/all.txt"]
            format = "comma_delimited"
            unit = "microseconds"

            [gpu]
            files = ["gpu/result1.txt", "gpu/result2.txt"]
            aux = "load_time"

            [thresholds]
            flag = 1.5
            top = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.universe, Some(660));
        assert_eq!(config.exclude_types, vec![3, 5]);
        assert_eq!(config.cpu.format, Some(LineFormat::CommaDelimited));
        assert_eq!(config.gpu.files.len(), 2);
        assert_eq!(config.top(None), 10);
        assert_eq!(config.top(Some(3)), 3);

        let gpu = config.gpu.schema(LineSchema::space_delimited());
        assert_eq!(gpu.aux, AuxColumn::LoadTime);
        assert_eq!(gpu.format, LineFormat::SpaceDelimited);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(DatasetConfig::parse("universes = 3").is_err());
    }

    #[test]
    fn flags_override_file_values() {
        let file = InputConfig {
            files: vec![PathBuf::from("a.txt")],
            format: Some(LineFormat::CommaDelimited),
            unit: Some(TimeUnit::Microseconds),
            ..InputConfig::default()
        };
        let flags = InputConfig {
            unit: Some(TimeUnit::Seconds),
            columns: Some(Columns::IdTime),
            ..InputConfig::default()
        };
        let merged = flags.or(&file);
        assert_eq!(merged.files, vec![PathBuf::from("a.txt")]);

        let schema = merged.schema(LineSchema::space_delimited());
        assert_eq!(schema.format, LineFormat::CommaDelimited);
        assert_eq!(schema.columns, Columns::IdTime);
        assert_eq!(schema.time_unit, TimeUnit::Seconds);
    }

    #[test]
    fn relative_paths_follow_the_file() {
        let mut config = DatasetConfig::parse("profiles = \"logs\"\n[cpu]\nfiles = [\"/abs/all.txt\", \"rel.txt\"]").unwrap();
        config.resolve_paths(Path::new("/data"));
        assert_eq!(config.profiles, Some(PathBuf::from("/data/logs")));
        assert_eq!(
            config.cpu.files,
            vec![PathBuf::from("/abs/all.txt"), PathBuf::from("/data/rel.txt")]
        );
    }
}
