//! Pipeline configuration
//!
//! Loaded from YAML or JSON and validated once before a run starts:
//!
//! ```yaml
//! sources:
//!   tournaments:
//!     - id: kpga
//!       kind: http
//!       url: https://example.com/kpga/schedule
//!       decoder: { format: html }
//!       defaults: { association: KPGA }
//!   golf_courses:
//!     - id: registry
//!       kind: file
//!       path: data/courses.csv
//!       decoder: { format: csv }
//! validation:
//!   golf_courses:
//!     required: [name, region]
//!     ranges: { holes: { min: 1, max: 36 } }
//! export:
//!   target: { kind: file, path: data/golf-data.json }
//!   backup_before_export: true
//! fetch:
//!   batch_size: 10
//!   retries: 2
//!   retry_delay_ms: 1000
//! ```

use crate::error::{Error, Result};
use crate::export::{FileBackend, SnapshotStore};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig};
use crate::normalize::ExtractionProfiles;
use crate::quality::QualityThresholds;
use crate::source::SourceDef;
use crate::types::DataType;
use crate::validate::ValidationRules;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Sources per data type
    pub sources: SourcesConfig,
    /// Validation rules per data type
    pub validation: ValidationRules,
    /// Snapshot target and export options
    pub export: ExportConfig,
    /// Quality thresholds applied to every data type
    pub quality: QualityThresholds,
    /// Fetch batching, retries and HTTP settings
    pub fetch: FetchConfig,
    /// Run every stage but skip the export write
    pub dry_run: bool,
}

impl EtlConfig {
    /// Load from a file; `.json` is parsed as JSON, anything else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: path.display().to_string(),
            },
            _ => Error::Io(e),
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check the whole config; every problem found here is a config error
    pub fn validate(&self) -> Result<()> {
        if DataType::ALL
            .iter()
            .all(|dt| self.sources.for_type(*dt).is_empty())
        {
            return Err(Error::config("no sources configured"));
        }

        let mut seen = HashSet::new();
        for data_type in DataType::ALL {
            let field = format!("sources.{}", config_key(data_type));
            for def in self.sources.for_type(data_type) {
                def.validate(&field)?;
                for id in def.ids() {
                    if !seen.insert(id.to_string()) {
                        return Err(Error::invalid_value(
                            field.clone(),
                            format!("duplicate source id '{id}'"),
                        ));
                    }
                }
            }
        }

        self.fetch.validate()?;
        self.quality.check()?;
        self.validation.check_fields()?;
        self.export.validate()?;
        Ok(())
    }

    /// Extraction settings for every configured source id
    pub fn extraction_profiles(&self) -> ExtractionProfiles {
        let mut profiles = ExtractionProfiles::new();
        for data_type in DataType::ALL {
            for def in self.sources.for_type(data_type) {
                def.collect_profiles(&mut profiles);
            }
        }
        profiles
    }

    /// Builder: replace the sources of one data type
    #[must_use]
    pub fn with_sources(mut self, data_type: DataType, defs: Vec<SourceDef>) -> Self {
        *self.sources.for_type_mut(data_type) = defs;
        self
    }
}

/// Key of a data type in config files
pub(crate) fn config_key(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Tournaments => "tournaments",
        DataType::GolfCourses => "golf_courses",
        DataType::Players => "players",
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Source definitions per data type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub tournaments: Vec<SourceDef>,
    pub golf_courses: Vec<SourceDef>,
    pub players: Vec<SourceDef>,
}

impl SourcesConfig {
    pub fn for_type(&self, data_type: DataType) -> &[SourceDef] {
        match data_type {
            DataType::Tournaments => &self.tournaments,
            DataType::GolfCourses => &self.golf_courses,
            DataType::Players => &self.players,
        }
    }

    pub fn for_type_mut(&mut self, data_type: DataType) -> &mut Vec<SourceDef> {
        match data_type {
            DataType::Tournaments => &mut self.tournaments,
            DataType::GolfCourses => &mut self.golf_courses,
            DataType::Players => &mut self.players,
        }
    }

    /// Data types with at least one source
    pub fn configured_types(&self) -> Vec<DataType> {
        DataType::ALL
            .into_iter()
            .filter(|dt| !self.for_type(*dt).is_empty())
            .collect()
    }
}

// ============================================================================
// Export
// ============================================================================

/// Where the snapshot is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportTarget {
    /// JSON file with backups alongside
    File {
        path: PathBuf,
        #[serde(default)]
        backup_dir: Option<PathBuf>,
    },
    /// In memory only (tests, trial runs)
    Memory,
}

impl Default for ExportTarget {
    fn default() -> Self {
        ExportTarget::File {
            path: PathBuf::from("data/golf-data.json"),
            backup_dir: None,
        }
    }
}

/// Export options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub target: ExportTarget,
    /// Back up the live snapshot before each export
    pub backup_before_export: bool,
    /// Pretty-print the snapshot file
    pub pretty: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target: ExportTarget::default(),
            backup_before_export: false,
            pretty: true,
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if let ExportTarget::File { path, .. } = &self.target {
            if path.as_os_str().is_empty() {
                return Err(Error::missing_field("export.target.path"));
            }
        }
        Ok(())
    }

    /// Open the configured snapshot store
    pub fn open_store(&self) -> SnapshotStore {
        match &self.target {
            ExportTarget::File { path, backup_dir } => {
                let backend = FileBackend::new(path, backup_dir.clone());
                if self.pretty {
                    SnapshotStore::new(backend)
                } else {
                    SnapshotStore::new(backend.compact())
                }
            }
            ExportTarget::Memory => SnapshotStore::in_memory(),
        }
    }
}

// ============================================================================
// Fetch
// ============================================================================

/// Upper bound on `fetch.retries`
pub const MAX_RETRIES: u32 = 10;

/// Fetch settings shared by all sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Sources fetched concurrently per batch
    pub batch_size: usize,
    /// Retries after the first attempt
    pub retries: u32,
    /// Fixed delay between attempts
    pub retry_delay_ms: u64,
    /// HTTP request timeout
    pub timeout_secs: u64,
    /// Shared HTTP rate limit; `None` disables limiting
    pub requests_per_second: Option<u32>,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retries: 2,
            retry_delay_ms: 1000,
            timeout_secs: 30,
            requests_per_second: Some(5),
            user_agent: None,
        }
    }
}

impl FetchConfig {
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid_value("fetch.batch_size", "must be at least 1"));
        }
        if self.retries > MAX_RETRIES {
            return Err(Error::invalid_value(
                "fetch.retries",
                format!("must be at most {MAX_RETRIES}"),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::invalid_value("fetch.timeout_secs", "must be at least 1"));
        }
        if self.requests_per_second == Some(0) {
            return Err(Error::invalid_value(
                "fetch.requests_per_second",
                "must be at least 1 (omit to disable limiting)",
            ));
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Build the HTTP client shared by a run's sources
    pub fn http_client(&self) -> Result<HttpClient> {
        let mut config = HttpClientConfig::default().timeout(Duration::from_secs(self.timeout_secs));
        config = match self.requests_per_second {
            Some(rps) => config.rate_limit(RateLimiterConfig::per_second(rps)),
            None => config.no_rate_limit(),
        };
        if let Some(agent) = &self.user_agent {
            config.user_agent.clone_from(agent);
        }
        HttpClient::with_config(config)
    }
}
