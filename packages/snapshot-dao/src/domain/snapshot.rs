//! Snapshot entity
//!
//! A snapshot is one point-in-time copy of a storage volume. Snapshots of a
//! volume form a backward-linked chain through `prev_snapshot_id`.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::query::{Column, Entity, FieldType};

/// Snapshot ID
pub type SnapshotId = i64;

/// Volume ID
pub type VolumeId = i64;

/// Table layout expected by the snapshot repository
///
/// Schema migration belongs to the deployment; this DDL documents the
/// columns and indexes the queries rely on and sets up test databases.
pub const SNAPSHOTS_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY,
    volume_id INTEGER NOT NULL,
    prev_snapshot_id INTEGER,
    type_description TEXT NOT NULL,
    removed TEXT
);
CREATE INDEX IF NOT EXISTS idx_snapshots_volume ON snapshots(volume_id);
CREATE INDEX IF NOT EXISTS idx_snapshots_prev ON snapshots(prev_snapshot_id);
";

/// Immutable point-in-time copy of a volume
///
/// # Examples
///
/// ```rust
/// use snapshot_dao::domain::{Snapshot, SnapshotType};
///
/// let first = Snapshot::new(1, 42, None, SnapshotType::Manual);
/// let second = Snapshot::new(2, 42, Some(first.id), SnapshotType::Hourly);
/// assert_eq!(second.prev_snapshot_id, Some(1));
/// assert!(!second.is_removed());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    /// Owning volume, fixed for the snapshot's lifetime
    pub volume_id: VolumeId,
    /// Snapshot this one was taken incrementally against
    pub prev_snapshot_id: Option<SnapshotId>,
    /// Categorical tag, see `SnapshotType`
    pub type_description: String,
    /// Soft-delete marker
    pub removed: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn new(
        id: SnapshotId,
        volume_id: VolumeId,
        prev_snapshot_id: Option<SnapshotId>,
        snapshot_type: SnapshotType,
    ) -> Self {
        Self {
            id,
            volume_id,
            prev_snapshot_id,
            type_description: snapshot_type.as_str().to_string(),
            removed: None,
        }
    }

    /// Mark as soft-deleted at `at`
    pub fn removed_at(mut self, at: DateTime<Utc>) -> Self {
        self.removed = Some(at);
        self
    }

    pub fn is_removed(&self) -> bool {
        self.removed.is_some()
    }

    /// Parsed `type_description`, None for tags outside `SnapshotType`
    pub fn snapshot_type(&self) -> Option<SnapshotType> {
        self.type_description.parse().ok()
    }
}

/// Known snapshot type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotType {
    Manual,
    Recurring,
    Template,
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl SnapshotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotType::Manual => "MANUAL",
            SnapshotType::Recurring => "RECURRING",
            SnapshotType::Template => "TEMPLATE",
            SnapshotType::Hourly => "HOURLY",
            SnapshotType::Daily => "DAILY",
            SnapshotType::Weekly => "WEEKLY",
            SnapshotType::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for SnapshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MANUAL" => Ok(SnapshotType::Manual),
            "RECURRING" => Ok(SnapshotType::Recurring),
            "TEMPLATE" => Ok(SnapshotType::Template),
            "HOURLY" => Ok(SnapshotType::Hourly),
            "DAILY" => Ok(SnapshotType::Daily),
            "WEEKLY" => Ok(SnapshotType::Weekly),
            "MONTHLY" => Ok(SnapshotType::Monthly),
            other => Err(format!("Unknown snapshot type: {}", other)),
        }
    }
}

/// Column tokens of the `snapshots` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotField {
    Id,
    VolumeId,
    PrevSnapshotId,
    TypeDescription,
    Removed,
}

impl Column for SnapshotField {
    fn name(self) -> &'static str {
        match self {
            SnapshotField::Id => "id",
            SnapshotField::VolumeId => "volume_id",
            SnapshotField::PrevSnapshotId => "prev_snapshot_id",
            SnapshotField::TypeDescription => "type_description",
            SnapshotField::Removed => "removed",
        }
    }

    fn field_type(self) -> FieldType {
        match self {
            SnapshotField::Id | SnapshotField::VolumeId | SnapshotField::PrevSnapshotId => {
                FieldType::Integer
            }
            SnapshotField::TypeDescription => FieldType::Text,
            SnapshotField::Removed => FieldType::Timestamp,
        }
    }

    fn nullable(self) -> bool {
        matches!(self, SnapshotField::PrevSnapshotId | SnapshotField::Removed)
    }
}

const SNAPSHOT_COLUMNS: [SnapshotField; 5] = [
    SnapshotField::Id,
    SnapshotField::VolumeId,
    SnapshotField::PrevSnapshotId,
    SnapshotField::TypeDescription,
    SnapshotField::Removed,
];

impl Entity for Snapshot {
    type Field = SnapshotField;

    const TABLE: &'static str = "snapshots";
    const PRIMARY_KEY: SnapshotField = SnapshotField::Id;
    const REMOVED: Option<SnapshotField> = Some(SnapshotField::Removed);

    fn columns() -> &'static [SnapshotField] {
        &SNAPSHOT_COLUMNS
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Snapshot {
            id: row.get(0)?,
            volume_id: row.get(1)?,
            prev_snapshot_id: row.get(2)?,
            type_description: row.get(3)?,
            removed: row.get(4)?,
        })
    }
}
