//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Commands
//!
//! - `run` - Run the ETL pipeline (optionally one type, optionally dry)
//! - `status` - Show snapshot metadata and backups
//! - `backup` - Back up the live snapshot
//! - `delete` - Delete the live snapshot
//! - `validate` - Check the configuration

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
