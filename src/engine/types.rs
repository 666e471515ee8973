//! Engine types
//!
//! Run state machine and run results.

use crate::error::{Error, Result};
use crate::export::{BackupRef, SnapshotMetadata, SnapshotRef};
use crate::quality::QualityReport;
use crate::types::{DataType, Issue, Stage};
use crate::validate::Violation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

// ============================================================================
// Run State
// ============================================================================

/// Progress of one data type through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Fetching,
    Normalizing,
    Merging,
    Validating,
    Exporting,
    Completed,
    Failed,
}

impl RunState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    /// The state that follows on success
    pub fn next(self) -> Option<RunState> {
        match self {
            RunState::Idle => Some(RunState::Fetching),
            RunState::Fetching => Some(RunState::Normalizing),
            RunState::Normalizing => Some(RunState::Merging),
            RunState::Merging => Some(RunState::Validating),
            RunState::Validating => Some(RunState::Exporting),
            RunState::Exporting => Some(RunState::Completed),
            RunState::Completed | RunState::Failed => None,
        }
    }

    /// Whether `self -> to` is a legal transition
    pub fn can_transition_to(self, to: RunState) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == RunState::Failed || self.next() == Some(to)
    }

    /// Stage whose failure leaves the type in this state
    pub fn stage(self) -> Stage {
        match self {
            RunState::Fetching => Stage::Fetch,
            RunState::Normalizing => Stage::Normalize,
            RunState::Merging => Stage::Merge,
            RunState::Validating => Stage::Validate,
            RunState::Exporting => Stage::Export,
            RunState::Idle | RunState::Completed | RunState::Failed => Stage::Controller,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Fetching => "fetching",
            RunState::Normalizing => "normalizing",
            RunState::Merging => "merging",
            RunState::Validating => "validating",
            RunState::Exporting => "exporting",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Enforces legal state transitions for one data type
#[derive(Debug, Clone)]
pub struct RunTracker {
    data_type: DataType,
    state: RunState,
    /// State before failing, to attribute the failure to a stage
    failed_in: Option<RunState>,
}

impl RunTracker {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            state: RunState::Idle,
            failed_in: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// State the type was in when it failed
    pub fn failed_in(&self) -> Option<RunState> {
        self.failed_in
    }

    /// Move to `to`, rejecting illegal transitions
    pub fn advance(&mut self, to: RunState) -> Result<()> {
        if !self.state.can_transition_to(to) {
            return Err(Error::state(format!(
                "{}: illegal transition {} -> {to}",
                self.data_type, self.state
            )));
        }
        debug!(data_type = %self.data_type, from = %self.state, to = %to, "State transition");
        if to == RunState::Failed {
            self.failed_in = Some(self.state);
        }
        self.state = to;
        Ok(())
    }

    /// Move to `Failed`; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.failed_in = Some(self.state);
            self.state = RunState::Failed;
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// How a run went overall
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every requested data type completed
    Success,
    /// Some data types completed, some failed
    PartialSuccess,
    /// Nothing was exported
    Failure,
}

/// Record counts for one data type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeStats {
    /// Sources configured
    pub sources: usize,
    /// Sources that failed (fallback or not)
    pub sources_failed: usize,
    /// Raw records fetched
    pub fetched: usize,
    /// Records built by normalization
    pub extracted: usize,
    /// Rows dropped by normalization
    pub dropped: usize,
    /// Records left after within-run dedup
    pub deduped: usize,
    /// Records after merging with the stored snapshot
    pub merged: usize,
    pub valid: usize,
    pub rejected: usize,
}

/// A rejected record, identified by key and source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub key: String,
    pub source: String,
    pub violations: Vec<Violation>,
}

/// Result for one data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRunResult {
    pub data_type: DataType,
    pub state: RunState,
    pub stats: TypeStats,
    /// Fallback sources that served data
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallbacks_used: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityReport>,
}

impl TypeRunResult {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            state: RunState::Idle,
            stats: TypeStats::default(),
            fallbacks_used: Vec::new(),
            rejected: Vec::new(),
            quality: None,
        }
    }

    pub fn fallback_used(&self) -> bool {
        !self.fallbacks_used.is_empty()
    }
}

/// Result of one ETL run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// `Completed` unless the run produced nothing
    pub state: RunState,
    pub outcome: RunOutcome,
    pub data_types: Vec<TypeRunResult>,
    pub warnings: Vec<Issue>,
    pub errors: Vec<Issue>,
    /// Written snapshot, absent on failure and dry runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<SnapshotRef>,
    /// Backup taken before exporting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupRef>,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunResult {
    /// A run that failed before any data type started
    pub fn failed(error: Issue, started_at: DateTime<Utc>) -> Self {
        let finished_at = Utc::now();
        Self {
            state: RunState::Failed,
            outcome: RunOutcome::Failure,
            data_types: Vec::new(),
            warnings: Vec::new(),
            errors: vec![error],
            export: None,
            backup: None,
            dry_run: false,
            started_at,
            finished_at,
            duration_ms: elapsed_ms(started_at, finished_at),
        }
    }

    /// Result for one data type
    pub fn type_result(&self, data_type: DataType) -> Option<&TypeRunResult> {
        self.data_types.iter().find(|t| t.data_type == data_type)
    }

    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Success
    }

    /// Warnings of one data type
    pub fn warnings_for(&self, data_type: DataType) -> Vec<&Issue> {
        self.warnings
            .iter()
            .filter(|w| w.data_type == Some(data_type))
            .collect()
    }
}

pub(crate) fn elapsed_ms(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

/// Read-only view of the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether a run currently holds the run guard
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<RunResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotMetadata>,
    pub backups: Vec<BackupRef>,
}
