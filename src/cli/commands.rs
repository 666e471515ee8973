//! CLI commands and argument parsing

use crate::types::DataType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Korean golf data ETL pipeline
#[derive(Parser, Debug)]
#[command(name = "fairway-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML, or JSON with a .json extension)
    #[arg(short, long, global = true, default_value = "fairway.yaml")]
    pub config: PathBuf,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, normalize, merge, validate and export
    Run {
        /// Only run one data type (tournaments, golf-courses, players)
        #[arg(long = "type", value_name = "TYPE")]
        data_type: Option<DataType>,

        /// Run every stage but do not write the snapshot
        #[arg(long)]
        dry_run: bool,
    },

    /// Show snapshot metadata and backups
    Status,

    /// Copy the live snapshot to a timestamped backup
    Backup,

    /// Delete the live snapshot (backups are kept)
    Delete {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Check the configuration without running
    Validate,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON, one document per line
    Json,
    /// Indented JSON
    Pretty,
}
