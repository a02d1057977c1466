//! snapshot-dao - typed query templates over a soft-deletable snapshot table
//!
//! ## Layers
//!
//! - `query`: predicate templates, bound criteria, live/including-removed execution
//! - `infrastructure`: SQLite store
//! - `domain`: `Snapshot` entity and the `SnapshotDao` repository
//! - `config`: store configuration from YAML or environment
//!
//! ## Usage
//!
//! ```rust
//! use snapshot_dao::{SnapshotDao, SnapshotDaoImpl, SqliteStore, SNAPSHOTS_SCHEMA};
//!
//! # fn main() -> snapshot_dao::Result<()> {
//! let store = SqliteStore::in_memory()?;
//! store.execute_batch(SNAPSHOTS_SCHEMA)?;
//! store.execute_batch(
//!     "INSERT INTO snapshots (id, volume_id, prev_snapshot_id, type_description)
//!      VALUES (1, 42, NULL, 'MANUAL'), (2, 42, 1, 'HOURLY');",
//! )?;
//!
//! let dao = SnapshotDaoImpl::new(store)?;
//! assert_eq!(dao.list_by_volume_id(42, None)?.len(), 2);
//! assert_eq!(dao.find_next_snapshot(1)?.map(|s| s.id), Some(2));
//! assert_eq!(dao.get_last_snapshot(42, 2)?, Some(1));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod query;

pub use config::StoreConfig;
pub use error::{ErrorKind, Result, StorageError};
pub use infrastructure::SqliteStore;

pub use domain::{
    Snapshot, SnapshotDao, SnapshotDaoImpl, SnapshotField, SnapshotType, SNAPSHOTS_SCHEMA,
};
pub use query::{
    Aggregate, ExecutionMode, Filter, Op, Order, QueryEngine, SearchBuilder, SearchCriteria,
    Template, Value,
};
