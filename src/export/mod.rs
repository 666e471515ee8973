//! Export module
//!
//! Owns the stored snapshot. It is the only component that writes it.
//!
//! # Overview
//!
//! - `SnapshotStore` - merge-on-write export, backup, delete and status
//! - `SnapshotBackend` - where the snapshot lives (`FileBackend`, `MemoryBackend`)
//! - `StoredSnapshot` / `PartialSnapshot` - the full dataset and one export's share of it
//!
//! Every mutation runs under the store's mutex, so concurrent exports read,
//! overlay and write one after the other and each gets its own version.
//! Versions never go backwards: after a delete, the next export continues
//! from the highest version seen in this store or its backups.

mod backend;
mod types;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend};
pub use types::{
    BackupRef, PartialSnapshot, SnapshotMetadata, SnapshotRef, SnapshotSection, StoredSnapshot,
};

use crate::error::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Versioned snapshot storage
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn SnapshotBackend>,
    /// Serializes mutations and holds the highest version written or deleted
    lock: Arc<Mutex<u64>>,
}

impl SnapshotStore {
    /// Store backed by any backend
    pub fn new(backend: impl SnapshotBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            lock: Arc::new(Mutex::new(0)),
        }
    }

    /// File store at `path`, backups in `backup_dir` or `<dir>/backups`
    pub fn file(path: impl AsRef<Path>, backup_dir: Option<PathBuf>) -> Self {
        Self::new(FileBackend::new(path, backup_dir))
    }

    /// In-memory store
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Location of the live snapshot
    pub fn location(&self) -> String {
        self.backend.location()
    }

    /// Read the live snapshot
    pub async fn load(&self) -> Result<Option<StoredSnapshot>> {
        self.backend.read().await
    }

    /// Version, timestamp and counts of the live snapshot
    pub async fn metadata(&self) -> Result<Option<SnapshotMetadata>> {
        Ok(self
            .backend
            .read()
            .await?
            .map(|s| s.metadata(self.backend.location())))
    }

    /// Overlay `partial` onto the live snapshot and write a new version
    ///
    /// Data types not carried by `partial` keep their stored records.
    pub async fn export(&self, partial: PartialSnapshot) -> Result<SnapshotRef> {
        let mut high_water = self.lock.lock().await;

        let data_types = partial.data_types();
        let previous = self.backend.read().await?;
        let floor = if previous.is_some() {
            *high_water
        } else {
            self.newest_backup_version().await?.max(*high_water)
        };
        let snapshot = partial.apply(previous, floor, Utc::now());
        self.backend.write(&snapshot).await?;
        *high_water = snapshot.version;

        info!(
            version = snapshot.version,
            location = %self.backend.location(),
            tournaments = snapshot.tournaments.len(),
            golf_courses = snapshot.golf_courses.len(),
            players = snapshot.players.len(),
            "Exported snapshot"
        );

        Ok(SnapshotRef {
            version: snapshot.version,
            last_updated: snapshot.last_updated,
            location: self.backend.location(),
            data_types,
        })
    }

    /// Copy the live snapshot to a timestamped backup
    pub async fn backup(&self) -> Result<BackupRef> {
        let _guard = self.lock.lock().await;
        self.backup_locked().await
    }

    /// Back up the live snapshot if there is one
    pub async fn backup_if_present(&self) -> Result<Option<BackupRef>> {
        let _guard = self.lock.lock().await;
        match self.backup_locked().await {
            Ok(backup) => Ok(Some(backup)),
            Err(Error::SnapshotNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn backup_locked(&self) -> Result<BackupRef> {
        let snapshot = self
            .backend
            .read()
            .await?
            .ok_or_else(|| Error::SnapshotNotFound {
                location: self.backend.location(),
            })?;
        let backup = self.backend.backup(&snapshot, Utc::now()).await?;
        info!(version = backup.version, backup = %backup.location, "Backed up snapshot");
        Ok(backup)
    }

    /// Remove the live snapshot; backups are kept
    ///
    /// The deleted version is remembered so the next export does not reuse it.
    pub async fn delete(&self) -> Result<()> {
        let mut high_water = self.lock.lock().await;
        // A corrupt snapshot can still be deleted
        if let Ok(Some(current)) = self.backend.read().await {
            *high_water = (*high_water).max(current.version);
        }
        if self.backend.delete().await? {
            warn!(location = %self.backend.location(), "Deleted snapshot");
            Ok(())
        } else {
            Err(Error::SnapshotNotFound {
                location: self.backend.location(),
            })
        }
    }

    /// Existing backups, oldest first
    pub async fn list_backups(&self) -> Result<Vec<BackupRef>> {
        self.backend.list_backups().await
    }

    async fn newest_backup_version(&self) -> Result<u64> {
        Ok(self
            .backend
            .list_backups()
            .await?
            .iter()
            .map(|b| b.version)
            .max()
            .unwrap_or(0))
    }
}
