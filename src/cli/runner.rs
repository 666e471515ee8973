//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{config_key, EtlConfig};
use crate::engine::{EtlController, RunOutcome};
use crate::error::{Error, Result, ResultExt};
use crate::types::DataType;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run { data_type, dry_run } => self.run_etl(*data_type, *dry_run).await,
            Commands::Status => self.status().await,
            Commands::Backup => self.backup().await,
            Commands::Delete { yes } => self.delete(*yes).await,
            Commands::Validate => self.validate(),
        }
    }

    fn load_config(&self) -> Result<EtlConfig> {
        let path = &self.cli.config;
        EtlConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
    }

    fn controller(&self, config: &EtlConfig) -> EtlController {
        EtlController::with_store(config.export.open_store())
    }

    /// Run the pipeline; a failed run is an error after its result is printed
    async fn run_etl(&self, data_type: Option<DataType>, dry_run: bool) -> Result<()> {
        let mut config = self.load_config()?;
        config.dry_run |= dry_run;

        let controller = self.controller(&config);
        let result = match data_type {
            Some(data_type) => controller.run_etl_for_type(data_type, &config).await,
            None => controller.run_etl(&config).await,
        };
        self.output(&result)?;

        if result.outcome == RunOutcome::Failure {
            let reasons: Vec<String> = result.errors.iter().map(ToString::to_string).collect();
            return Err(Error::Other(format!("run failed: {}", reasons.join("; "))));
        }
        Ok(())
    }

    async fn status(&self) -> Result<()> {
        let config = self.load_config()?;
        let status = self.controller(&config).status().await?;
        self.output(&status)
    }

    async fn backup(&self) -> Result<()> {
        let config = self.load_config()?;
        let backup = config.export.open_store().backup().await?;
        info!(name = %backup.name, version = backup.version, "Backup written");
        self.output(&backup)
    }

    async fn delete(&self, confirmed: bool) -> Result<()> {
        if !confirmed {
            return Err(Error::config("refusing to delete the snapshot without --yes"));
        }
        let config = self.load_config()?;
        let store = config.export.open_store();
        store.delete().await?;
        self.output(&json!({
            "deleted": store.location(),
        }))
    }

    /// Validate the configuration and summarize its sources
    fn validate(&self) -> Result<()> {
        let config = self.load_config()?;
        config.validate()?;

        let sources: BTreeMap<&str, usize> = DataType::ALL
            .iter()
            .map(|dt| (config_key(*dt), config.sources.for_type(*dt).len()))
            .collect();
        self.output(&json!({
            "valid": true,
            "config": self.cli.config.display().to_string(),
            "sources": sources,
            "dry_run": config.dry_run,
        }))
    }

    fn output<T: Serialize>(&self, value: &T) -> Result<()> {
        let text = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(value)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        };
        println!("{text}");
        Ok(())
    }
}
