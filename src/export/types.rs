//! Snapshot types
//!
//! The stored snapshot is camelCase JSON:
//!
//! ```json
//! {
//!   "tournaments": [...],
//!   "golfCourses": [...],
//!   "players": [...],
//!   "lastUpdated": "2024-05-01T09:00:00Z",
//!   "version": 3
//! }
//! ```

use crate::record::{DomainRecord, GolfCourse, Player, Tournament};
use crate::types::DataType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Snapshot
// ============================================================================

/// The exported dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    #[serde(default)]
    pub tournaments: Vec<Tournament>,
    #[serde(default)]
    pub golf_courses: Vec<GolfCourse>,
    #[serde(default)]
    pub players: Vec<Player>,
    pub last_updated: DateTime<Utc>,
    pub version: u64,
}

impl StoredSnapshot {
    /// Records of one data type
    pub fn records<T: SnapshotSection>(&self) -> &[T] {
        T::section(self)
    }

    /// Record count of one data type
    pub fn count(&self, data_type: DataType) -> usize {
        match data_type {
            DataType::Tournaments => self.tournaments.len(),
            DataType::GolfCourses => self.golf_courses.len(),
            DataType::Players => self.players.len(),
        }
    }

    /// Version, timestamp and counts
    pub fn metadata(&self, location: impl Into<String>) -> SnapshotMetadata {
        SnapshotMetadata {
            version: self.version,
            last_updated: self.last_updated,
            location: location.into(),
            tournaments: self.tournaments.len(),
            golf_courses: self.golf_courses.len(),
            players: self.players.len(),
        }
    }
}

/// Data types to write in one export; `None` keeps the stored records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSnapshot {
    pub tournaments: Option<Vec<Tournament>>,
    pub golf_courses: Option<Vec<GolfCourse>>,
    pub players: Option<Vec<Player>>,
}

impl PartialSnapshot {
    /// Set the records of one data type
    pub fn set<T: SnapshotSection>(&mut self, records: Vec<T>) {
        T::put(self, records);
    }

    /// Builder form of [`PartialSnapshot::set`]
    #[must_use]
    pub fn with<T: SnapshotSection>(mut self, records: Vec<T>) -> Self {
        self.set(records);
        self
    }

    /// Data types carried by this export
    pub fn data_types(&self) -> Vec<DataType> {
        let mut out = Vec::new();
        if self.tournaments.is_some() {
            out.push(DataType::Tournaments);
        }
        if self.golf_courses.is_some() {
            out.push(DataType::GolfCourses);
        }
        if self.players.is_some() {
            out.push(DataType::Players);
        }
        out
    }

    /// Whether no data type is carried
    pub fn is_empty(&self) -> bool {
        self.data_types().is_empty()
    }

    /// Overlay onto the previous snapshot (or an empty one)
    ///
    /// The new version is one past the previous version or `floor`,
    /// whichever is higher.
    pub(crate) fn apply(
        self,
        previous: Option<StoredSnapshot>,
        floor: u64,
        now: DateTime<Utc>,
    ) -> StoredSnapshot {
        let (tournaments, golf_courses, players, version) = match previous {
            Some(prev) => (prev.tournaments, prev.golf_courses, prev.players, prev.version),
            None => (Vec::new(), Vec::new(), Vec::new(), 0),
        };
        StoredSnapshot {
            tournaments: self.tournaments.unwrap_or(tournaments),
            golf_courses: self.golf_courses.unwrap_or(golf_courses),
            players: self.players.unwrap_or(players),
            last_updated: now,
            version: version.max(floor) + 1,
        }
    }
}

/// Access to a record type's slot in the snapshot
pub trait SnapshotSection: DomainRecord {
    fn section(snapshot: &StoredSnapshot) -> &[Self];
    fn put(partial: &mut PartialSnapshot, records: Vec<Self>);
}

impl SnapshotSection for Tournament {
    fn section(snapshot: &StoredSnapshot) -> &[Self] {
        &snapshot.tournaments
    }

    fn put(partial: &mut PartialSnapshot, records: Vec<Self>) {
        partial.tournaments = Some(records);
    }
}

impl SnapshotSection for GolfCourse {
    fn section(snapshot: &StoredSnapshot) -> &[Self] {
        &snapshot.golf_courses
    }

    fn put(partial: &mut PartialSnapshot, records: Vec<Self>) {
        partial.golf_courses = Some(records);
    }
}

impl SnapshotSection for Player {
    fn section(snapshot: &StoredSnapshot) -> &[Self] {
        &snapshot.players
    }

    fn put(partial: &mut PartialSnapshot, records: Vec<Self>) {
        partial.players = Some(records);
    }
}

// ============================================================================
// References
// ============================================================================

/// Result of a successful export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRef {
    pub version: u64,
    pub last_updated: DateTime<Utc>,
    pub location: String,
    pub data_types: Vec<DataType>,
}

/// A stored backup copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRef {
    pub name: String,
    pub location: String,
    /// Version of the snapshot that was copied
    pub version: u64,
    pub last_updated: DateTime<Utc>,
}

/// Summary of the live snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub version: u64,
    pub last_updated: DateTime<Utc>,
    pub location: String,
    pub tournaments: usize,
    pub golf_courses: usize,
    pub players: usize,
}
