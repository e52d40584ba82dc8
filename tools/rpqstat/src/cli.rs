//! Command-line interface definitions for rpqstat.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rpq_log::{AuxColumn, Columns, LineFormat, Platform, TimeUnit};

use crate::config::InputConfig;

/// CPU versus GPU statistics for RPQ benchmark logs.
#[derive(Parser)]
#[command(name = "rpqstat", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Dataset file (default: ./rpqstat.toml if present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print only results and answer mismatches.
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print every diagnostic and step timings.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Aggregate per-run result files of one platform into a result.txt.
    Collect(CollectArgs),
    /// Compare CPU and GPU results.
    Compare(CompareArgs),
    /// Per-type sums and speedups.
    Types(TypesArgs),
    /// Query construction versus execution time of raw GPU runs.
    Load(LoadArgs),
    /// Join GPU results with per-query profile logs.
    Profile(ProfileArgs),
    /// Check answer counts against an expected result file.
    Validate(ValidateArgs),
}

/// Schema overrides for a set of input files.
#[derive(Args, Clone, Default)]
pub struct SchemaArgs {
    /// Line format: space_delimited, comma_delimited or annotated.
    #[arg(long)]
    pub format: Option<LineFormat>,

    /// Column layout: id_time_aux_answers, id_time_answers or id_time.
    #[arg(long)]
    pub columns: Option<Columns>,

    /// Unit of the time columns: seconds or microseconds.
    #[arg(long)]
    pub unit: Option<TimeUnit>,

    /// Meaning of the third column: std_dev or load_time.
    #[arg(long)]
    pub aux: Option<AuxColumn>,
}

impl SchemaArgs {
    /// Overrides for `files` in dataset-file form.
    pub fn to_input(&self, files: &[PathBuf]) -> InputConfig {
        InputConfig {
            files: files.to_vec(),
            format: self.format,
            columns: self.columns,
            unit: self.unit,
            aux: self.aux,
        }
    }
}

/// CPU and GPU inputs shared by the comparing subcommands.
#[derive(Args, Clone, Default)]
pub struct PairArgs {
    /// CPU result file(s); several files are aggregated as runs.
    #[arg(long, num_args = 1..)]
    pub cpu: Vec<PathBuf>,

    /// CPU line format.
    #[arg(long)]
    pub cpu_format: Option<LineFormat>,

    /// CPU column layout.
    #[arg(long)]
    pub cpu_columns: Option<Columns>,

    /// CPU time unit.
    #[arg(long)]
    pub cpu_unit: Option<TimeUnit>,

    /// GPU result file(s); several files are aggregated as runs.
    #[arg(long, num_args = 1..)]
    pub gpu: Vec<PathBuf>,

    /// GPU line format.
    #[arg(long)]
    pub gpu_format: Option<LineFormat>,

    /// GPU column layout.
    #[arg(long)]
    pub gpu_columns: Option<Columns>,

    /// GPU time unit.
    #[arg(long)]
    pub gpu_unit: Option<TimeUnit>,

    /// Number of queries in the suite (default: largest id seen).
    #[arg(long)]
    pub universe: Option<u32>,
}

impl PairArgs {
    /// CPU overrides in dataset-file form.
    pub fn cpu_input(&self) -> InputConfig {
        InputConfig {
            files: self.cpu.clone(),
            format: self.cpu_format,
            columns: self.cpu_columns,
            unit: self.cpu_unit,
            aux: None,
        }
    }

    /// GPU overrides in dataset-file form.
    pub fn gpu_input(&self) -> InputConfig {
        InputConfig {
            files: self.gpu.clone(),
            format: self.gpu_format,
            columns: self.gpu_columns,
            unit: self.gpu_unit,
            aux: None,
        }
    }
}

/// Arguments for the `collect` subcommand.
#[derive(Parser)]
pub struct CollectArgs {
    /// Per-run result files, one per run.
    #[arg(required = true)]
    pub runs: Vec<PathBuf>,

    /// Platform the runs were taken on.
    #[arg(long, value_parser = parse_platform, default_value = "gpu")]
    pub platform: Platform,

    /// Output path of the aggregated result.
    #[arg(short = 'o', long, default_value = "result.txt")]
    pub output: PathBuf,

    /// Number of largest relative errors to print.
    #[arg(long)]
    pub top: Option<usize>,

    #[command(flatten)]
    pub schema: SchemaArgs,
}

/// Arguments for the `compare` subcommand.
#[derive(Parser)]
pub struct CompareArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Speedup at or above which a query is flagged.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Number of worst and best queries to print.
    #[arg(long)]
    pub top: Option<usize>,

    /// Seconds above which a query counts as big.
    #[arg(long)]
    pub big: Option<f64>,

    /// Write derived text reports into this directory.
    #[arg(long)]
    pub reports: Option<PathBuf>,

    /// Write a JSON report to this file.
    #[arg(long)]
    pub json: Option<PathBuf>,
}

/// Arguments for the `types` subcommand.
#[derive(Parser)]
pub struct TypesArgs {
    #[command(flatten)]
    pub pair: PairArgs,

    /// Queries per type.
    #[arg(long)]
    pub per_type: Option<u32>,

    /// Number of types (default: enough to cover the universe).
    #[arg(long)]
    pub types: Option<u32>,

    /// 1-based types to leave out.
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<u32>,
}

/// Arguments for the `load` subcommand.
#[derive(Parser)]
pub struct LoadArgs {
    /// Raw GPU run files carrying a load time column.
    #[arg(required_unless_present = "logs", conflicts_with = "logs")]
    pub runs: Vec<PathBuf>,

    /// Read `load=<s>,exec=<s>` from line 1 of `<dir>/<id>.txt` instead.
    #[arg(long, value_name = "DIR")]
    pub logs: Option<PathBuf>,

    /// Number of queries to look for under `--logs`.
    #[arg(long)]
    pub universe: Option<u32>,

    /// Load/execute ratio at or above which a query is listed.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Number of fastest executions to print.
    #[arg(long, default_value = "0")]
    pub fastest: usize,

    /// Also count the queries executing in at most this many seconds.
    #[arg(long)]
    pub max_exec: Option<f64>,

    #[command(flatten)]
    pub schema: SchemaArgs,
}

/// Arguments for the `profile` subcommand.
#[derive(Parser)]
pub struct ProfileArgs {
    /// GPU result file(s).
    #[arg(long, num_args = 1..)]
    pub gpu: Vec<PathBuf>,

    /// Directory holding `<id>.txt` profile logs.
    #[arg(long)]
    pub logs: Option<PathBuf>,

    /// Ignore queries executing in at most this many seconds.
    #[arg(long)]
    pub min_time: Option<f64>,

    #[command(flatten)]
    pub schema: SchemaArgs,
}

/// Arguments for the `validate` subcommand.
#[derive(Parser)]
pub struct ValidateArgs {
    /// Result file to check.
    pub result: PathBuf,

    /// Result file holding the expected answer counts.
    #[arg(long)]
    pub expected: PathBuf,

    /// Line format of the expected file (default: same as the result).
    #[arg(long)]
    pub expected_format: Option<LineFormat>,

    #[command(flatten)]
    pub schema: SchemaArgs,
}

fn parse_platform(s: &str) -> Result<Platform, String> {
    match s.to_ascii_lowercase().as_str() {
        "cpu" => Ok(Platform::Cpu),
        "gpu" => Ok(Platform::Gpu),
        other => Err(format!("unknown platform '{other}' (expected: cpu, gpu)")),
    }
}
