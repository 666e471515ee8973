//! Snapshot storage backends
//!
//! Provides file-based storage with atomic writes, and an in-memory store for
//! tests and dry runs. Backends do no locking of their own; callers go
//! through [`super::SnapshotStore`], which serializes writers.

use super::types::{BackupRef, StoredSnapshot};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Backup timestamp, e.g. `20240501T090000123Z`
const BACKUP_STAMP: &str = "%Y%m%dT%H%M%S%3fZ";

/// Storage for the live snapshot and its backups
#[async_trait]
pub trait SnapshotBackend: Send + Sync + Debug {
    /// Read the live snapshot, `None` when there is none
    async fn read(&self) -> Result<Option<StoredSnapshot>>;

    /// Replace the live snapshot
    async fn write(&self, snapshot: &StoredSnapshot) -> Result<()>;

    /// Copy the live snapshot to a new backup
    async fn backup(&self, snapshot: &StoredSnapshot, at: DateTime<Utc>) -> Result<BackupRef>;

    /// Remove the live snapshot; `false` when there was none
    async fn delete(&self) -> Result<bool>;

    /// Existing backups, oldest first
    async fn list_backups(&self) -> Result<Vec<BackupRef>>;

    /// Human-readable location of the live snapshot
    fn location(&self) -> String;
}

// ============================================================================
// File Backend
// ============================================================================

/// Snapshot stored as a JSON file
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
    backup_dir: PathBuf,
    pretty: bool,
}

impl FileBackend {
    /// Store at `path`, with backups in `backup_dir` (default: `<dir>/backups`)
    pub fn new(path: impl AsRef<Path>, backup_dir: Option<PathBuf>) -> Self {
        let path = path.as_ref().to_path_buf();
        let backup_dir = backup_dir.unwrap_or_else(|| {
            path.parent()
                .map_or_else(|| PathBuf::from("backups"), |p| p.join("backups"))
        });
        Self {
            path,
            backup_dir,
            pretty: true,
        }
    }

    /// Write compact JSON instead of pretty-printed
    #[must_use]
    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .map_or_else(|| "snapshot".to_string(), |s| s.to_string_lossy().into_owned())
    }

    fn encode(&self, snapshot: &StoredSnapshot) -> Result<String> {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(snapshot)
        } else {
            serde_json::to_string(snapshot)
        };
        encoded.map_err(|e| Error::export(format!("Failed to serialize snapshot: {e}")))
    }
}

/// Write to a temp file next to `path`, then rename over it
async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::export(format!("Failed to create {}: {e}", parent.display()))
        })?;
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, contents)
        .await
        .map_err(|e| Error::export(format!("Failed to write {}: {e}", temp_path.display())))?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| Error::export(format!("Failed to rename snapshot file: {e}")))?;

    Ok(())
}

/// The parts of a snapshot needed to describe a backup
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotHeader {
    version: u64,
    last_updated: DateTime<Utc>,
}

#[async_trait]
impl SnapshotBackend for FileBackend {
    async fn read(&self) -> Result<Option<StoredSnapshot>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::export(format!(
                    "Failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let snapshot = serde_json::from_str(&contents).map_err(|e| {
            Error::export(format!("Failed to parse {}: {e}", self.path.display()))
        })?;
        Ok(Some(snapshot))
    }

    async fn write(&self, snapshot: &StoredSnapshot) -> Result<()> {
        let contents = self.encode(snapshot)?;
        write_atomic(&self.path, &contents).await
    }

    async fn backup(&self, snapshot: &StoredSnapshot, at: DateTime<Utc>) -> Result<BackupRef> {
        tokio::fs::create_dir_all(&self.backup_dir).await.map_err(|e| {
            Error::export(format!(
                "Failed to create backup directory {}: {e}",
                self.backup_dir.display()
            ))
        })?;

        let base = format!("{}.{}", self.stem(), at.format(BACKUP_STAMP));
        let mut name = format!("{base}.json");
        let mut n = 1;
        while tokio::fs::try_exists(self.backup_dir.join(&name))
            .await
            .unwrap_or(false)
        {
            name = format!("{base}-{n}.json");
            n += 1;
        }

        let target = self.backup_dir.join(&name);
        write_atomic(&target, &self.encode(snapshot)?).await?;

        Ok(BackupRef {
            name,
            location: target.display().to_string(),
            version: snapshot.version,
            last_updated: snapshot.last_updated,
        })
    }

    async fn delete(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::export(format!(
                "Failed to delete {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn list_backups(&self) -> Result<Vec<BackupRef>> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}.", self.stem());
        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || !name.ends_with(".json") {
                continue;
            }
            let contents = tokio::fs::read_to_string(entry.path()).await?;
            let Ok(header) = serde_json::from_str::<SnapshotHeader>(&contents) else {
                continue;
            };
            backups.push(BackupRef {
                location: entry.path().display().to_string(),
                name,
                version: header.version,
                last_updated: header.last_updated,
            });
        }

        backups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(backups)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// Memory Backend
// ============================================================================

/// Snapshot kept in memory (no file persistence)
#[derive(Debug, Default)]
pub struct MemoryBackend {
    live: RwLock<Option<StoredSnapshot>>,
    backups: RwLock<Vec<(BackupRef, StoredSnapshot)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: StoredSnapshot) -> Self {
        Self {
            live: RwLock::new(Some(snapshot)),
            backups: RwLock::default(),
        }
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn read(&self) -> Result<Option<StoredSnapshot>> {
        Ok(self.live.read().await.clone())
    }

    async fn write(&self, snapshot: &StoredSnapshot) -> Result<()> {
        *self.live.write().await = Some(snapshot.clone());
        Ok(())
    }

    async fn backup(&self, snapshot: &StoredSnapshot, at: DateTime<Utc>) -> Result<BackupRef> {
        let mut backups = self.backups.write().await;
        let name = format!(
            "snapshot.{}-{}.json",
            at.format(BACKUP_STAMP),
            backups.len()
        );
        let backup = BackupRef {
            location: format!("memory://backups/{name}"),
            name,
            version: snapshot.version,
            last_updated: snapshot.last_updated,
        };
        backups.push((backup.clone(), snapshot.clone()));
        Ok(backup)
    }

    async fn delete(&self) -> Result<bool> {
        Ok(self.live.write().await.take().is_some())
    }

    async fn list_backups(&self) -> Result<Vec<BackupRef>> {
        Ok(self
            .backups
            .read()
            .await
            .iter()
            .map(|(backup, _)| backup.clone())
            .collect())
    }

    fn location(&self) -> String {
        "memory://snapshot".to_string()
    }
}
