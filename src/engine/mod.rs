//! ETL controller
//!
//! Runs the pipeline for every configured data type.
//!
//! # Overview
//!
//! - `EtlContext` - shared store, adapter registry, run guard and last result
//! - `EtlController` - `run_etl`, `run_etl_for_type` and `status`
//! - `RunTracker` - per-type state machine
//!
//! ```text
//! idle -> fetching -> normalizing -> merging -> validating -> exporting -> completed
//!            \______________\______________\_____________\____________\-> failed
//! ```
//!
//! Data types run concurrently and independently: one type failing does not
//! stop its siblings. All surviving types are written in a single export.
//! Only one run executes at a time; a second `run_etl` while one is active
//! returns a failed result instead of waiting.

mod fetch;
mod types;

pub use types::{
    RejectedRecord, RunOutcome, RunResult, RunState, RunTracker, StatusReport, TypeRunResult,
    TypeStats,
};

use crate::config::EtlConfig;
use crate::error::{Error, Result};
use crate::export::{
    BackupRef, PartialSnapshot, SnapshotRef, SnapshotSection, SnapshotStore, StoredSnapshot,
};
use crate::merge::{dedupe, merge};
use crate::normalize::{normalize_with, ExtractionProfiles, Normalize};
use crate::quality;
use crate::record::{DomainRecord, GolfCourse, Player, Tournament};
use crate::source::{SourceBinding, SourceRegistry};
use crate::types::{DataType, Issue, Stage};
use crate::validate::validate;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use types::elapsed_ms;

// ============================================================================
// Context
// ============================================================================

/// State shared by every run of a controller
#[derive(Debug)]
pub struct EtlContext {
    store: SnapshotStore,
    registry: SourceRegistry,
    run_guard: Mutex<()>,
    last_result: RwLock<Option<RunResult>>,
}

impl EtlContext {
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store,
            registry: SourceRegistry::new(),
            run_guard: Mutex::new(()),
            last_result: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Adapters for `kind: registered` sources
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Whether a run holds the run guard
    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Result of the most recent run that acquired the guard
    pub async fn last_result(&self) -> Option<RunResult> {
        self.last_result.read().await.clone()
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Drives ETL runs against a shared context
#[derive(Debug, Clone)]
pub struct EtlController {
    context: Arc<EtlContext>,
}

impl EtlController {
    pub fn new(context: Arc<EtlContext>) -> Self {
        Self { context }
    }

    /// Controller with a fresh context around `store`
    pub fn with_store(store: SnapshotStore) -> Self {
        Self::new(Arc::new(EtlContext::new(store)))
    }

    pub fn context(&self) -> &Arc<EtlContext> {
        &self.context
    }

    /// Run every data type that has sources configured
    pub async fn run_etl(&self, config: &EtlConfig) -> RunResult {
        self.run(None, config).await
    }

    /// Run a single data type
    pub async fn run_etl_for_type(&self, data_type: DataType, config: &EtlConfig) -> RunResult {
        self.run(Some(data_type), config).await
    }

    pub fn is_running(&self) -> bool {
        self.context.is_running()
    }

    /// Running flag, last result, current snapshot and backups
    pub async fn status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            running: self.context.is_running(),
            last_run: self.context.last_result().await,
            snapshot: self.context.store.metadata().await?,
            backups: self.context.store.list_backups().await?,
        })
    }

    async fn run(&self, only: Option<DataType>, config: &EtlConfig) -> RunResult {
        let started_at = Utc::now();

        let Ok(_guard) = self.context.run_guard.try_lock() else {
            warn!("Rejected run: another run is in progress");
            return RunResult::failed(
                Issue::new(Stage::Controller, Error::RunInProgress.to_string()),
                started_at,
            );
        };

        let result = match self.run_locked(only, config, started_at).await {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, "Run failed");
                let stage = if e.is_config() {
                    Stage::Config
                } else if matches!(e, Error::Export { .. } | Error::Io(_)) {
                    Stage::Export
                } else {
                    Stage::Controller
                };
                let mut result = RunResult::failed(Issue::new(stage, e.to_string()), started_at);
                result.dry_run = config.dry_run;
                result
            }
        };

        *self.context.last_result.write().await = Some(result.clone());
        result
    }

    async fn run_locked(
        &self,
        only: Option<DataType>,
        config: &EtlConfig,
        started_at: DateTime<Utc>,
    ) -> Result<RunResult> {
        config.validate()?;

        let plan = match only {
            Some(data_type) if config.sources.for_type(data_type).is_empty() => {
                return Err(Error::config(format!("no sources configured for {data_type}")));
            }
            Some(data_type) => vec![data_type],
            None => config.sources.configured_types(),
        };

        info!(
            data_types = ?plan,
            dry_run = config.dry_run,
            store = %self.context.store.location(),
            "Starting ETL run"
        );

        let client = config.fetch.http_client()?;
        let mut bindings = HashMap::new();
        for data_type in &plan {
            let built = config
                .sources
                .for_type(*data_type)
                .iter()
                .map(|def| def.build(&client, &self.context.registry))
                .collect::<Result<Vec<_>>>()?;
            bindings.insert(*data_type, built);
        }

        let profiles = config.extraction_profiles();
        let snapshot = self.context.store.load().await?;

        let pipeline = Pipeline {
            config,
            profiles: &profiles,
            snapshot: snapshot.as_ref(),
        };
        let (tournaments, golf_courses, players) = tokio::join!(
            pipeline.run_type::<Tournament>(bindings.remove(&DataType::Tournaments)),
            pipeline.run_type::<GolfCourse>(bindings.remove(&DataType::GolfCourses)),
            pipeline.run_type::<Player>(bindings.remove(&DataType::Players)),
        );

        let mut partial = PartialSnapshot::default();
        let mut finished = Vec::new();
        collect(tournaments, &mut partial, &mut finished);
        collect(golf_courses, &mut partial, &mut finished);
        collect(players, &mut partial, &mut finished);

        let mut warnings = Vec::new();
        let mut errors = Vec::new();
        for f in &mut finished {
            warnings.append(&mut f.warnings);
            errors.append(&mut f.errors);
        }

        let mut export = None;
        let mut backup = None;
        let mut export_failed = false;
        if partial.is_empty() {
            info!("No data type reached export");
        } else if config.dry_run {
            info!(data_types = ?partial.data_types(), "Dry run, skipping export");
        } else {
            match self.write_snapshot(partial, config).await {
                Ok((taken, written)) => {
                    backup = taken;
                    export = Some(written);
                }
                Err(e) => {
                    error!(error = %e, "Export failed");
                    errors.push(Issue::new(Stage::Export, e.to_string()));
                    export_failed = true;
                }
            }
        }

        for f in &mut finished {
            if f.tracker.state() == RunState::Exporting {
                if export_failed {
                    f.tracker.fail();
                } else {
                    f.tracker.advance(RunState::Completed)?;
                }
            }
            f.result.state = f.tracker.state();
        }

        let completed = finished
            .iter()
            .filter(|f| f.tracker.state() == RunState::Completed)
            .count();
        let outcome = if completed == 0 {
            RunOutcome::Failure
        } else if completed == finished.len() {
            RunOutcome::Success
        } else {
            RunOutcome::PartialSuccess
        };

        let finished_at = Utc::now();
        let result = RunResult {
            state: if outcome == RunOutcome::Failure {
                RunState::Failed
            } else {
                RunState::Completed
            },
            outcome,
            data_types: finished.into_iter().map(|f| f.result).collect(),
            warnings,
            errors,
            export,
            backup,
            dry_run: config.dry_run,
            started_at,
            finished_at,
            duration_ms: elapsed_ms(started_at, finished_at),
        };

        info!(
            outcome = ?result.outcome,
            warnings = result.warnings.len(),
            errors = result.errors.len(),
            version = result.export.as_ref().map(|e| e.version),
            duration_ms = result.duration_ms,
            "ETL run finished"
        );
        Ok(result)
    }

    async fn write_snapshot(
        &self,
        partial: PartialSnapshot,
        config: &EtlConfig,
    ) -> Result<(Option<BackupRef>, SnapshotRef)> {
        let backup = if config.export.backup_before_export {
            self.context.store.backup_if_present().await?
        } else {
            None
        };
        let written = self.context.store.export(partial).await?;
        Ok((backup, written))
    }
}

// ============================================================================
// Per-type pipeline
// ============================================================================

/// Inputs shared by the per-type pipelines of one run
struct Pipeline<'a> {
    config: &'a EtlConfig,
    profiles: &'a ExtractionProfiles,
    snapshot: Option<&'a StoredSnapshot>,
}

/// A data type's pipeline result before export
struct TypeOutcome<T> {
    result: TypeRunResult,
    tracker: RunTracker,
    warnings: Vec<Issue>,
    errors: Vec<Issue>,
    /// Valid records, present when the type reached export
    records: Option<Vec<T>>,
}

/// Type-erased [`TypeOutcome`] after its records went into the snapshot
struct Finished {
    result: TypeRunResult,
    tracker: RunTracker,
    warnings: Vec<Issue>,
    errors: Vec<Issue>,
}

fn collect<T: SnapshotSection>(
    outcome: Option<TypeOutcome<T>>,
    partial: &mut PartialSnapshot,
    finished: &mut Vec<Finished>,
) {
    let Some(outcome) = outcome else {
        return;
    };
    if let Some(records) = outcome.records {
        partial.set(records);
    }
    finished.push(Finished {
        result: outcome.result,
        tracker: outcome.tracker,
        warnings: outcome.warnings,
        errors: outcome.errors,
    });
}

impl Pipeline<'_> {
    /// Run one data type; `None` when it is not part of this run
    async fn run_type<T: Normalize + SnapshotSection>(
        &self,
        bindings: Option<Vec<SourceBinding>>,
    ) -> Option<TypeOutcome<T>> {
        let bindings = bindings?;
        let data_type = T::DATA_TYPE;
        let mut out = TypeOutcome {
            result: TypeRunResult::new(data_type),
            tracker: RunTracker::new(data_type),
            warnings: Vec::new(),
            errors: Vec::new(),
            records: None,
        };

        match self.process::<T>(&bindings, &mut out).await {
            Ok(records) => out.records = records,
            Err(e) => {
                let stage = out.tracker.state().stage();
                out.tracker.fail();
                error!(data_type = %data_type, stage = %stage, error = %e, "Data type failed");
                out.errors.push(Issue::new(stage, e.to_string()).for_type(data_type));
            }
        }

        out.result.state = out.tracker.state();
        Some(out)
    }

    /// Fetch, normalize, merge and validate; `Ok(None)` when quality gates
    /// failed the type
    async fn process<T: Normalize + SnapshotSection>(
        &self,
        bindings: &[SourceBinding],
        out: &mut TypeOutcome<T>,
    ) -> Result<Option<Vec<T>>> {
        let data_type = T::DATA_TYPE;

        out.tracker.advance(RunState::Fetching)?;
        let fetched = fetch::fetch_all(bindings, &self.config.fetch, data_type).await;
        out.result.stats.sources = bindings.len();
        out.result.stats.sources_failed = fetched.failed;
        out.result.stats.fetched = fetched.records.len();
        out.result.fallbacks_used = fetched.fallbacks_used;
        out.warnings.extend(fetched.warnings);
        if fetched.succeeded == 0 {
            return Err(Error::Other(format!("all {} sources failed", bindings.len())));
        }

        out.tracker.advance(RunState::Normalizing)?;
        let normalized = normalize_with::<T>(&fetched.records, self.profiles);
        out.result.stats.extracted = normalized.records.len();
        out.result.stats.dropped = normalized.dropped;
        out.warnings.extend(normalized.warnings);

        out.tracker.advance(RunState::Merging)?;
        let (deduped, collisions) = dedupe(normalized.records);
        out.warnings.extend(collisions);
        out.result.stats.deduped = deduped.len();
        let existing = self.snapshot.map_or(&[][..], |s| s.records::<T>());
        let merged = merge(existing, &deduped);
        out.result.stats.merged = merged.len();

        out.tracker.advance(RunState::Validating)?;
        let validated = validate(merged, self.config.validation.for_type(data_type));
        out.result.stats.valid = validated.valid.len();
        out.result.stats.rejected = validated.rejected.len();
        out.result.rejected = validated
            .rejected
            .iter()
            .map(|r| RejectedRecord {
                key: r.record.logical_key().to_string(),
                source: r.record.provenance().source.clone(),
                violations: r.violations.clone(),
            })
            .collect();

        let report = quality::evaluate(&validated, &self.config.quality);
        let passed = report.passed();
        if passed {
            out.warnings.extend(report.issues());
        } else {
            out.errors.extend(report.issues());
        }
        out.result.quality = Some(report);
        if !passed {
            warn!(data_type = %data_type, "Quality thresholds not met, skipping export");
            out.tracker.fail();
            return Ok(None);
        }

        out.tracker.advance(RunState::Exporting)?;
        info!(
            data_type = %data_type,
            fetched = out.result.stats.fetched,
            valid = out.result.stats.valid,
            rejected = out.result.stats.rejected,
            "Data type ready for export"
        );
        Ok(Some(validated.valid))
    }
}

#[cfg(test)]
mod tests;
