//! Tests for the ETL controller

use super::*;
use crate::config::ExportTarget;
use crate::export::SnapshotBackend;
use crate::quality::QualityThresholds;
use crate::source::{Source, SourceDef, SourceKind};
use crate::types::RawRecord;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::tempdir;

// ============================================================================
// Test sources
// ============================================================================

/// Always fails, counting attempts
#[derive(Debug)]
struct FailingSource {
    retryable: bool,
    calls: AtomicUsize,
}

impl FailingSource {
    fn new(retryable: bool) -> Arc<Self> {
        Arc::new(Self {
            retryable,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Source for FailingSource {
    fn id(&self) -> &str {
        "failing"
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.retryable {
            Err(Error::fetch("failing", "connection reset"))
        } else {
            Err(Error::decode("unexpected payload"))
        }
    }
}

/// Returns one course after a delay, tracking peak concurrency
#[derive(Debug)]
struct SlowSource {
    delay: Duration,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SlowSource {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Source for SlowSource {
    fn id(&self) -> &str {
        "slow"
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        let row = json!({"name": "Slow CC", "region": "강원", "holes": "18"});
        Ok(vec![RawRecord::row(
            "slow",
            row.as_object().cloned().unwrap_or_default(),
        )])
    }
}

/// Empty store that refuses writes
#[derive(Debug)]
struct ReadOnlyBackend;

#[async_trait]
impl SnapshotBackend for ReadOnlyBackend {
    async fn read(&self) -> Result<Option<StoredSnapshot>> {
        Ok(None)
    }

    async fn write(&self, _snapshot: &StoredSnapshot) -> Result<()> {
        Err(Error::export("store is read-only"))
    }

    async fn backup(&self, _snapshot: &StoredSnapshot, _at: DateTime<Utc>) -> Result<BackupRef> {
        Err(Error::export("store is read-only"))
    }

    async fn delete(&self) -> Result<bool> {
        Ok(false)
    }

    async fn list_backups(&self) -> Result<Vec<BackupRef>> {
        Ok(Vec::new())
    }

    fn location(&self) -> String {
        "read-only".to_string()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn config() -> EtlConfig {
    let mut config = EtlConfig::default();
    config.export.target = ExportTarget::Memory;
    config.fetch.retry_delay_ms = 0;
    config.fetch.requests_per_second = None;
    config
}

fn registered(id: &str, adapter: &str) -> SourceDef {
    SourceDef::new(
        id,
        SourceKind::Registered {
            adapter: adapter.to_string(),
        },
    )
}

fn tournaments_source(id: &str) -> SourceDef {
    SourceDef::inline(
        id,
        vec![
            json!({"name": "KPGA 선수권", "start_date": "2024-06-06", "region": "경남", "association": "KPGA"}),
            json!({"name": "SK텔레콤 오픈", "start_date": "2024-05-16", "region": "제주", "association": "KPGA"}),
        ],
    )
}

fn courses_source(id: &str) -> SourceDef {
    SourceDef::inline(
        id,
        vec![
            json!({"name": "Sky72", "region": "인천", "holes": "36", "course_type": "대중제"}),
            json!({"name": "남서울CC", "region": "경기", "holes": "18", "course_type": "회원제"}),
        ],
    )
}

fn controller() -> EtlController {
    EtlController::with_store(SnapshotStore::in_memory())
}

async fn stored<T: SnapshotSection>(controller: &EtlController) -> Vec<T> {
    controller
        .context()
        .store()
        .load()
        .await
        .unwrap()
        .map(|s| s.records::<T>().to_vec())
        .unwrap_or_default()
}

// ============================================================================
// Run flow
// ============================================================================

#[tokio::test]
async fn test_full_run_exports_all_types() {
    let controller = controller();
    let config = config()
        .with_sources(DataType::Tournaments, vec![tournaments_source("kpga")])
        .with_sources(
            DataType::GolfCourses,
            vec![SourceDef::inline(
                "registry",
                vec![json!({"name": "Sky72", "region": "인천", "holes": "36"})],
            )],
        );

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    assert_eq!(result.state, RunState::Completed);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.export.as_ref().map(|e| e.version), Some(1));
    assert_eq!(result.data_types.len(), 2);

    let tournaments = result.type_result(DataType::Tournaments).unwrap();
    assert_eq!(tournaments.state, RunState::Completed);
    assert_eq!(tournaments.stats.fetched, 2);
    assert_eq!(tournaments.stats.valid, 2);
    assert!(result.type_result(DataType::Players).is_none());

    let stored = stored::<Tournament>(&controller).await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|t| t.id.is_some()));
}

#[tokio::test]
async fn test_failed_sources_warn_once_each_and_are_excluded() {
    let controller = controller();
    let failing = FailingSource::new(true);
    controller
        .context()
        .registry()
        .register("down", failing.clone());

    let config = config().with_sources(
        DataType::Tournaments,
        vec![
            tournaments_source("kpga"),
            registered("klpga", "down"),
            registered("pga-mirror", "down"),
        ],
    );

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    let warnings = result.warnings_for(DataType::Tournaments);
    assert_eq!(warnings.len(), 2, "{warnings:?}");
    assert!(warnings.iter().all(|w| w.stage == Stage::Fetch));
    assert!(warnings.iter().all(|w| w.message.contains("records excluded")));
    let mut sources: Vec<_> = warnings.iter().filter_map(|w| w.source.clone()).collect();
    sources.sort();
    assert_eq!(sources, vec!["klpga", "pga-mirror"]);

    let stats = result.type_result(DataType::Tournaments).unwrap().stats;
    assert_eq!(stats.sources, 3);
    assert_eq!(stats.sources_failed, 2);
    // Two sources, one initial attempt plus two retries each
    assert_eq!(failing.calls.load(Ordering::SeqCst), 6);

    let stored = stored::<Tournament>(&controller).await;
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|t| t.provenance.source == "kpga"));
}

#[tokio::test]
async fn test_non_retryable_error_is_not_retried() {
    let controller = controller();
    let failing = FailingSource::new(false);
    controller.context().registry().register("bad", failing.clone());

    let config = config().with_sources(
        DataType::Tournaments,
        vec![tournaments_source("kpga"), registered("broken", "bad")],
    );
    let result = controller.run_etl(&config).await;

    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.warnings_for(DataType::Tournaments).len(), 1);
}

#[tokio::test]
async fn test_max_retry_count_does_not_overflow() {
    let mut settings = config().fetch;
    settings.retries = u32::MAX;

    let failing = FailingSource::new(false);
    let err = fetch::fetch_with_retry(failing.as_ref(), &settings)
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fallback_serves_failed_source() {
    let controller = controller();
    controller
        .context()
        .registry()
        .register("down", FailingSource::new(true));

    let config = config().with_sources(
        DataType::GolfCourses,
        vec![registered("registry", "down").with_fallback(courses_source("registry-mock"))],
    );

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Success);
    let courses = result.type_result(DataType::GolfCourses).unwrap();
    assert!(courses.fallback_used());
    assert_eq!(courses.fallbacks_used, vec!["registry-mock"]);
    assert_eq!(courses.stats.sources_failed, 1);

    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("using fallback 'registry-mock'"));
    assert_eq!(result.warnings[0].source.as_deref(), Some("registry"));

    let stored = stored::<GolfCourse>(&controller).await;
    assert!(stored.iter().all(|c| c.provenance.source == "registry-mock"));
}

#[tokio::test]
async fn test_bad_csv_row_drops_only_that_row() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("courses.csv");
    std::fs::write(
        &file,
        "name,region,holes\nSky72,인천,36\n\"Broken,경기,18\nLake,경기,18\n",
    )
    .unwrap();

    let controller = controller();
    let config = config().with_sources(
        DataType::GolfCourses,
        vec![SourceDef::new(
            "registry",
            SourceKind::File {
                path: file,
                decoder: crate::decode::DecoderConfig::csv(),
            },
        )],
    );

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Success, "{:?}", result.errors);
    let courses = result.type_result(DataType::GolfCourses).unwrap();
    assert_eq!(courses.stats.sources_failed, 0);
    assert_eq!(courses.stats.dropped, 1);
    assert!(result
        .warnings_for(DataType::GolfCourses)
        .iter()
        .any(|w| w.stage == Stage::Normalize && w.message.starts_with("registry#1: ")));
    assert_eq!(stored::<GolfCourse>(&controller).await.len(), 2);
}

#[tokio::test]
async fn test_failed_type_does_not_stop_siblings() {
    let controller = controller();
    controller
        .context()
        .registry()
        .register("down", FailingSource::new(true));

    let config = config()
        .with_sources(DataType::Tournaments, vec![registered("kpga", "down")])
        .with_sources(DataType::GolfCourses, vec![courses_source("registry")]);

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::PartialSuccess);
    assert_eq!(result.state, RunState::Completed);
    assert_eq!(
        result.type_result(DataType::Tournaments).unwrap().state,
        RunState::Failed
    );
    assert_eq!(
        result.type_result(DataType::GolfCourses).unwrap().state,
        RunState::Completed
    );

    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].stage, Stage::Fetch);
    assert_eq!(result.errors[0].data_type, Some(DataType::Tournaments));

    assert!(stored::<Tournament>(&controller).await.is_empty());
    assert_eq!(stored::<GolfCourse>(&controller).await.len(), 2);
}

#[tokio::test]
async fn test_every_type_failing_is_a_failed_run() {
    let controller = controller();
    controller
        .context()
        .registry()
        .register("down", FailingSource::new(true));
    let config = config().with_sources(DataType::Players, vec![registered("kpga", "down")]);

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Failure);
    assert_eq!(result.state, RunState::Failed);
    assert!(result.export.is_none());
    assert!(controller.context().store().load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_sources_fetched_in_batches() {
    let controller = controller();
    let slow = SlowSource::new(Duration::from_millis(30));
    let peak = slow.peak.clone();
    controller.context().registry().register("slow", Arc::new(slow));

    let mut config = config().with_sources(
        DataType::GolfCourses,
        (0..5).map(|i| registered(&format!("s{i}"), "slow")).collect(),
    );
    config.fetch.batch_size = 2;

    let result = controller.run_etl(&config).await;

    assert!(result.is_success());
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    let courses = result.type_result(DataType::GolfCourses).unwrap();
    assert_eq!(courses.stats.fetched, 5);
    // Same course from five sources collapses to one record
    assert_eq!(courses.stats.deduped, 1);
}

#[tokio::test]
async fn test_run_for_single_type() {
    let controller = controller();
    let config = config()
        .with_sources(DataType::Tournaments, vec![tournaments_source("kpga")])
        .with_sources(DataType::GolfCourses, vec![courses_source("registry")]);

    let result = controller
        .run_etl_for_type(DataType::GolfCourses, &config)
        .await;

    assert!(result.is_success());
    assert_eq!(result.data_types.len(), 1);
    assert_eq!(
        result.export.as_ref().map(|e| e.data_types.clone()),
        Some(vec![DataType::GolfCourses])
    );
    assert!(stored::<Tournament>(&controller).await.is_empty());
}

#[tokio::test]
async fn test_run_for_type_without_sources_is_config_failure() {
    let controller = controller();
    let config = config().with_sources(DataType::Tournaments, vec![tournaments_source("kpga")]);

    let result = controller.run_etl_for_type(DataType::Players, &config).await;

    assert_eq!(result.outcome, RunOutcome::Failure);
    assert_eq!(result.errors[0].stage, Stage::Config);
    assert!(result.errors[0].message.contains("players"));
}

#[tokio::test]
async fn test_invalid_config_fails_before_fetching() {
    let controller = controller();
    let failing = FailingSource::new(true);
    controller.context().registry().register("down", failing.clone());

    let mut config = config().with_sources(DataType::Players, vec![registered("kpga", "down")]);
    config.fetch.batch_size = 0;

    let result = controller.run_etl(&config).await;

    assert_eq!(result.state, RunState::Failed);
    assert_eq!(result.errors[0].stage, Stage::Config);
    assert_eq!(failing.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unregistered_adapter_fails_run() {
    let controller = controller();
    let config = config().with_sources(DataType::Players, vec![registered("kpga", "nope")]);

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Failure);
    assert_eq!(result.errors[0].stage, Stage::Config);
}

// ============================================================================
// Validation and quality
// ============================================================================

#[tokio::test]
async fn test_rejected_records_are_reported_not_exported() {
    let controller = controller();
    let config = config().with_sources(
        DataType::GolfCourses,
        vec![SourceDef::inline(
            "registry",
            vec![
                json!({"name": "Sky72", "region": "인천", "holes": "36"}),
                json!({"name": "Giant CC", "region": "경기", "holes": "40"}),
            ],
        )],
    );

    let result = controller.run_etl(&config).await;

    assert!(result.is_success());
    let courses = result.type_result(DataType::GolfCourses).unwrap();
    assert_eq!(courses.stats.valid, 1);
    assert_eq!(courses.stats.rejected, 1);
    assert_eq!(courses.rejected[0].source, "registry");
    assert_eq!(courses.rejected[0].violations[0].field, "holes");

    let stored = stored::<GolfCourse>(&controller).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "Sky72");
}

#[tokio::test]
async fn test_enforced_quality_breach_fails_type() {
    let controller = controller();
    let mut config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);
    config.quality = QualityThresholds {
        min_records: 5,
        enforce: true,
        ..QualityThresholds::default()
    };

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Failure);
    assert!(result.errors.iter().all(|e| e.stage == Stage::Quality));
    let courses = result.type_result(DataType::GolfCourses).unwrap();
    assert_eq!(courses.state, RunState::Failed);
    assert!(courses.quality.as_ref().is_some_and(|q| !q.passed()));
    assert!(result.export.is_none());
}

#[tokio::test]
async fn test_unenforced_quality_breach_warns() {
    let controller = controller();
    let mut config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);
    config.quality.min_records = 5;

    let result = controller.run_etl(&config).await;

    assert!(result.is_success());
    assert!(result.warnings.iter().any(|w| w.stage == Stage::Quality));
}

// ============================================================================
// Export behaviour
// ============================================================================

#[tokio::test]
async fn test_dry_run_skips_export() {
    let controller = controller();
    let mut config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);
    config.dry_run = true;

    let result = controller.run_etl(&config).await;

    assert!(result.is_success());
    assert!(result.dry_run);
    assert!(result.export.is_none());
    assert_eq!(
        result.type_result(DataType::GolfCourses).unwrap().stats.valid,
        2
    );
    assert!(controller.context().store().load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let controller = controller();
    let config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);

    let first = controller.run_etl(&config).await;
    let before = stored::<GolfCourse>(&controller).await;
    let second = controller.run_etl(&config).await;
    let after = stored::<GolfCourse>(&controller).await;

    assert_eq!(first.export.unwrap().version, 1);
    assert_eq!(second.export.unwrap().version, 2);
    let ids = |records: &[GolfCourse]| records.iter().map(|c| c.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&before), ids(&after));
    assert_eq!(before.len(), after.len());
}

#[tokio::test]
async fn test_run_keeps_records_missing_from_sources() {
    let controller = controller();
    let first = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);
    controller.run_etl(&first).await;

    let second = config().with_sources(
        DataType::GolfCourses,
        vec![SourceDef::inline(
            "registry",
            vec![json!({"name": "Blue Heron", "region": "경기", "holes": "18"})],
        )],
    );
    let result = controller.run_etl(&second).await;

    assert_eq!(
        result.type_result(DataType::GolfCourses).unwrap().stats.merged,
        3
    );
    assert_eq!(stored::<GolfCourse>(&controller).await.len(), 3);
}

#[tokio::test]
async fn test_backup_before_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("golf-data.json");
    let controller = EtlController::with_store(SnapshotStore::file(&path, None));
    let mut config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);
    config.export.backup_before_export = true;

    let first = controller.run_etl(&config).await;
    assert!(first.backup.is_none());

    let second = controller.run_etl(&config).await;
    let backup = second.backup.expect("backup of version 1");
    assert_eq!(backup.version, 1);
    assert_eq!(second.export.unwrap().version, 2);

    let status = controller.status().await.unwrap();
    assert_eq!(status.backups.len(), 1);
    assert_eq!(status.snapshot.map(|s| s.version), Some(2));
}

#[tokio::test]
async fn test_export_failure_fails_exporting_types() {
    let controller = EtlController::with_store(SnapshotStore::new(ReadOnlyBackend));
    let config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Failure);
    assert_eq!(
        result.type_result(DataType::GolfCourses).unwrap().state,
        RunState::Failed
    );
    assert!(result.export.is_none());
    assert!(result
        .errors
        .iter()
        .any(|e| e.stage == Stage::Export && e.message.contains("read-only")));
}

#[tokio::test]
async fn test_unreadable_snapshot_fails_run() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("golf-data.json");
    std::fs::write(&path, "{ not json").unwrap();
    let controller = EtlController::with_store(SnapshotStore::file(&path, None));
    let config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);

    let result = controller.run_etl(&config).await;

    assert_eq!(result.outcome, RunOutcome::Failure);
    assert!(result.data_types.is_empty());
    assert_eq!(result.errors[0].stage, Stage::Export);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
}

// ============================================================================
// Concurrency and status
// ============================================================================

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let controller = controller();
    controller
        .context()
        .registry()
        .register("slow", Arc::new(SlowSource::new(Duration::from_millis(200))));
    let config = config().with_sources(DataType::GolfCourses, vec![registered("registry", "slow")]);

    let (first, second) = tokio::join!(controller.run_etl(&config), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(controller.is_running());
        controller.run_etl(&config).await
    });

    assert!(first.is_success());
    assert_eq!(second.outcome, RunOutcome::Failure);
    assert_eq!(second.errors[0].stage, Stage::Controller);
    assert!(second.errors[0].message.contains("in progress"));

    // The rejected run does not replace the last result
    let status = controller.status().await.unwrap();
    assert!(!status.running);
    assert_eq!(status.last_run.map(|r| r.outcome), Some(RunOutcome::Success));
}

#[tokio::test]
async fn test_status_before_any_run() {
    let status = controller().status().await.unwrap();

    assert!(!status.running);
    assert!(status.last_run.is_none());
    assert!(status.snapshot.is_none());
    assert!(status.backups.is_empty());
}

#[tokio::test]
async fn test_status_after_run() {
    let controller = controller();
    let config = config().with_sources(DataType::GolfCourses, vec![courses_source("registry")]);
    controller.run_etl(&config).await;

    let status = controller.status().await.unwrap();

    let snapshot = status.snapshot.unwrap();
    assert_eq!(snapshot.version, 1);
    assert_eq!(snapshot.golf_courses, 2);
    assert!(status.last_run.is_some_and(|r| r.is_success()));
}

// ============================================================================
// State machine
// ============================================================================

#[test]
fn test_tracker_follows_pipeline_order() {
    let mut tracker = RunTracker::new(DataType::Players);
    for state in [
        RunState::Fetching,
        RunState::Normalizing,
        RunState::Merging,
        RunState::Validating,
        RunState::Exporting,
        RunState::Completed,
    ] {
        tracker.advance(state).unwrap();
    }
    assert_eq!(tracker.state(), RunState::Completed);
    assert!(tracker.advance(RunState::Failed).is_err());
}

#[test]
fn test_tracker_rejects_skipped_stage() {
    let mut tracker = RunTracker::new(DataType::Players);
    tracker.advance(RunState::Fetching).unwrap();

    let err = tracker.advance(RunState::Validating).unwrap_err();
    assert!(matches!(err, Error::State { .. }));
    assert_eq!(tracker.state(), RunState::Fetching);
}

#[test]
fn test_tracker_fail_records_stage() {
    let mut tracker = RunTracker::new(DataType::Tournaments);
    tracker.advance(RunState::Fetching).unwrap();
    tracker.advance(RunState::Normalizing).unwrap();
    tracker.fail();

    assert_eq!(tracker.state(), RunState::Failed);
    assert_eq!(tracker.failed_in(), Some(RunState::Normalizing));
    assert_eq!(tracker.failed_in().map(RunState::stage), Some(Stage::Normalize));

    tracker.fail();
    assert_eq!(tracker.failed_in(), Some(RunState::Normalizing));
}
