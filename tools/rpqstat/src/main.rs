//! RPQ benchmark statistics.
//!
//! Reads CPU and GPU result logs, aggregates repeated runs, compares the
//! platforms query by query and writes the derived files the chart scripts
//! plot.
//!
//! Pipeline: read logs → aggregate runs → compare / group → print tables and
//!           write reports.

mod cli;
mod collect;
mod compare;
mod config;
mod input;
mod load;
mod profile;
mod validate;
mod verbose;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    verbose::init(cli.quiet, cli.verbose);

    let config = config::DatasetConfig::load(cli.config.as_deref())?;

    match cli.command {
        cli::Command::Collect(ref args) => collect::cmd_collect(args, &config),
        cli::Command::Compare(ref args) => compare::cmd_compare(args, &config),
        cli::Command::Types(ref args) => compare::cmd_types(args, &config),
        cli::Command::Load(ref args) => load::cmd_load(args, &config),
        cli::Command::Profile(ref args) => profile::cmd_profile(args, &config),
        cli::Command::Validate(ref args) => validate::cmd_validate(args),
    }
}
