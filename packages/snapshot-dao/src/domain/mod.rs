//! Domain layer - snapshot entity and repository
//!
//! - `Snapshot`: point-in-time copy of a volume, soft-deletable
//! - `SnapshotField`: column tokens used to build templates
//! - `SnapshotDao`: repository contract, implemented by `SnapshotDaoImpl`

mod snapshot;
mod snapshot_dao;

pub use snapshot::{Snapshot, SnapshotField, SnapshotId, SnapshotType, VolumeId, SNAPSHOTS_SCHEMA};
pub use snapshot_dao::{SnapshotDao, SnapshotDaoImpl};
