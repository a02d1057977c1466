//! Snapshot repository
//!
//! Read-only lookups over the `snapshots` table. The four query templates are
//! frozen once in `SnapshotDaoImpl::new` and shared by every call.

use tracing::info;

use super::snapshot::{Snapshot, SnapshotField, SnapshotId, VolumeId};
use crate::error::Result;
use crate::infrastructure::SqliteStore;
use crate::query::{Aggregate, Filter, Op, QueryEngine, SearchBuilder, Template};

const PARAM_VOLUME_ID: &str = "volume_id";
const PARAM_TYPE: &str = "type";
const PARAM_PREV_SNAPSHOT_ID: &str = "prev_snapshot_id";
const PARAM_SNAP_ID: &str = "snap_id";

/// Snapshot lookups
///
/// Implementations are shared between threads; every operation is
/// independent and read-only.
pub trait SnapshotDao: Send + Sync {
    /// Live snapshots of `volume_id`
    fn list_by_volume_id(
        &self,
        volume_id: VolumeId,
        filter: Option<&Filter<SnapshotField>>,
    ) -> Result<Vec<Snapshot>>;

    /// Live snapshots of `volume_id` whose `type_description` is
    /// `snapshot_type`; pass `SnapshotType::as_str()` for the known tags
    fn list_by_volume_id_type(
        &self,
        volume_id: VolumeId,
        snapshot_type: &str,
        filter: Option<&Filter<SnapshotField>>,
    ) -> Result<Vec<Snapshot>>;

    /// The snapshot taken against `snapshot_id`, removed rows included
    ///
    /// # Errors
    ///
    /// `MultipleResults` when more than one snapshot names `snapshot_id` as
    /// its predecessor.
    fn find_next_snapshot(&self, snapshot_id: SnapshotId) -> Result<Option<Snapshot>>;

    /// Highest snapshot ID of `volume_id` other than `exclude_snapshot_id`,
    /// removed rows included
    fn get_last_snapshot(
        &self,
        volume_id: VolumeId,
        exclude_snapshot_id: SnapshotId,
    ) -> Result<Option<SnapshotId>>;
}

/// `SnapshotDao` backed by the query engine
pub struct SnapshotDaoImpl {
    engine: QueryEngine<Snapshot>,
    volume_id_search: Template<Snapshot>,
    volume_id_type_search: Template<Snapshot>,
    parent_id_search: Template<Snapshot>,
    last_snap_search: Template<Snapshot, i64>,
}

impl SnapshotDaoImpl {
    pub fn new(store: SqliteStore) -> Result<Self> {
        let volume_id_search = SearchBuilder::<Snapshot>::new("VolumeIdSearch")
            .and(PARAM_VOLUME_ID, SnapshotField::VolumeId, Op::Eq)?
            .freeze();

        let volume_id_type_search = SearchBuilder::<Snapshot>::new("VolumeIdTypeSearch")
            .and(PARAM_VOLUME_ID, SnapshotField::VolumeId, Op::Eq)?
            .and(PARAM_TYPE, SnapshotField::TypeDescription, Op::Eq)?
            .freeze();

        let parent_id_search = SearchBuilder::<Snapshot>::new("ParentIdSearch")
            .and(PARAM_PREV_SNAPSHOT_ID, SnapshotField::PrevSnapshotId, Op::Eq)?
            .freeze();

        let last_snap_search = SearchBuilder::<Snapshot>::new("LastSnapSearch")
            .select::<i64>(Aggregate::Max, SnapshotField::Id)?
            .and(PARAM_VOLUME_ID, SnapshotField::VolumeId, Op::Eq)?
            .and(PARAM_SNAP_ID, SnapshotField::Id, Op::Neq)?
            .freeze();

        info!(
            templates = ?[
                volume_id_search.name(),
                volume_id_type_search.name(),
                parent_id_search.name(),
                last_snap_search.name(),
            ],
            "snapshot repository initialized"
        );

        Ok(Self {
            engine: QueryEngine::new(store),
            volume_id_search,
            volume_id_type_search,
            parent_id_search,
            last_snap_search,
        })
    }

    pub fn engine(&self) -> &QueryEngine<Snapshot> {
        &self.engine
    }
}

impl SnapshotDao for SnapshotDaoImpl {
    fn list_by_volume_id(
        &self,
        volume_id: VolumeId,
        filter: Option<&Filter<SnapshotField>>,
    ) -> Result<Vec<Snapshot>> {
        let mut sc = self.volume_id_search.create();
        sc.set_parameter(PARAM_VOLUME_ID, volume_id)?;
        self.engine.list_by(&sc, filter)
    }

    fn list_by_volume_id_type(
        &self,
        volume_id: VolumeId,
        snapshot_type: &str,
        filter: Option<&Filter<SnapshotField>>,
    ) -> Result<Vec<Snapshot>> {
        let mut sc = self.volume_id_type_search.create();
        sc.set_parameter(PARAM_VOLUME_ID, volume_id)?
            .set_parameter(PARAM_TYPE, snapshot_type)?;
        self.engine.list_by(&sc, filter)
    }

    fn find_next_snapshot(&self, snapshot_id: SnapshotId) -> Result<Option<Snapshot>> {
        let mut sc = self.parent_id_search.create();
        sc.set_parameter(PARAM_PREV_SNAPSHOT_ID, snapshot_id)?;
        self.engine.find_one_including_removed_by(&sc)
    }

    fn get_last_snapshot(
        &self,
        volume_id: VolumeId,
        exclude_snapshot_id: SnapshotId,
    ) -> Result<Option<SnapshotId>> {
        let mut sc = self.last_snap_search.create();
        sc.set_parameter(PARAM_VOLUME_ID, volume_id)?
            .set_parameter(PARAM_SNAP_ID, exclude_snapshot_id)?;
        Ok(self
            .engine
            .search_including_removed(&sc, None)?
            .into_iter()
            .next())
    }
}
