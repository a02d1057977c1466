//! End-to-end tests: configuration, file-backed stores, shared repository

mod common;

use std::sync::Arc;
use std::thread;

use chrono::Utc;
use pretty_assertions::assert_eq;
use snapshot_dao::query::{Filter, Order};
use snapshot_dao::{
    ErrorKind, Snapshot, SnapshotDao, SnapshotDaoImpl, SnapshotField, SnapshotType, SqliteStore,
    StoreConfig,
};

fn chain_42() -> Vec<Snapshot> {
    vec![
        Snapshot::new(1, 42, None, SnapshotType::Manual),
        Snapshot::new(2, 42, Some(1), SnapshotType::Recurring),
        Snapshot::new(3, 42, Some(2), SnapshotType::Recurring),
    ]
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_volume_42_chain() {
    common::init_tracing();
    let dao = SnapshotDaoImpl::new(common::seeded_store(&chain_42())).unwrap();

    assert_eq!(dao.list_by_volume_id(42, None).unwrap(), chain_42());
    assert_eq!(dao.find_next_snapshot(1).unwrap().map(|s| s.id), Some(2));
    assert_eq!(dao.find_next_snapshot(3).unwrap(), None);
    assert_eq!(dao.get_last_snapshot(42, 3).unwrap(), Some(2));
    assert_eq!(dao.get_last_snapshot(42, 1).unwrap(), Some(3));
}

#[test]
fn test_removed_snapshot_visibility() {
    common::init_tracing();
    let mut rows = chain_42();
    rows[2] = rows[2].clone().removed_at(Utc::now());
    let dao = SnapshotDaoImpl::new(common::seeded_store(&rows)).unwrap();

    let live: Vec<i64> = dao
        .list_by_volume_id(42, None)
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(live, vec![1, 2]);

    // chain navigation and the last-snapshot lookup still see removed rows
    assert!(dao.find_next_snapshot(2).unwrap().unwrap().is_removed());
    assert_eq!(dao.get_last_snapshot(42, 1).unwrap(), Some(3));
}

// ============================================================================
// Configuration & file-backed stores
// ============================================================================

#[test]
fn test_file_backed_store_from_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("snapshots.db");

    let writer = SqliteStore::open(&StoreConfig::file(&db_path)).unwrap();
    common::seed(&writer, &chain_42());
    drop(writer);

    let config_path = dir.path().join("store.yaml");
    let yaml = format!(
        "version: 1\npath: {}\nbusy_timeout_ms: 250\nread_only: true\n",
        db_path.display()
    );
    std::fs::write(&config_path, yaml).unwrap();

    let config = StoreConfig::from_yaml(&config_path).unwrap();
    assert!(config.read_only);
    assert_eq!(config.busy_timeout_ms, 250);

    let dao = SnapshotDaoImpl::new(SqliteStore::open(&config).unwrap()).unwrap();
    let filter = Filter::new().order_by(SnapshotField::Id, Order::Desc).limit(1);
    let newest = dao.list_by_volume_id(42, Some(&filter)).unwrap();
    assert_eq!(newest.len(), 1);
    assert_eq!(newest[0].id, 3);
}

#[test]
fn test_read_only_store_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("snapshots.db");
    common::seed(&SqliteStore::open(&StoreConfig::file(&db_path)).unwrap(), &chain_42());

    let store = SqliteStore::open(&StoreConfig::file(&db_path).read_only(true)).unwrap();
    let err = store
        .execute_batch("DELETE FROM snapshots")
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
}

#[test]
fn test_config_from_env_lookup() {
    let config = StoreConfig::from_lookup(|var| match var {
        "SNAPSHOT_DB_BUSY_TIMEOUT_MS" => Some("1200".to_string()),
        _ => None,
    })
    .unwrap();

    assert_eq!(config.path, None);
    assert_eq!(config.busy_timeout_ms, 1200);
    assert!(SqliteStore::open(&config).is_ok());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_shared_repository_across_threads() {
    let mut rows = Vec::new();
    for volume in 0..4i64 {
        for n in 0..5i64 {
            let id = volume * 10 + n + 1;
            let prev = if n == 0 { None } else { Some(id - 1) };
            rows.push(Snapshot::new(id, volume, prev, SnapshotType::Daily));
        }
    }
    let dao: Arc<dyn SnapshotDao> = Arc::new(SnapshotDaoImpl::new(common::seeded_store(&rows)).unwrap());

    let handles: Vec<_> = (0..4i64)
        .map(|volume| {
            let dao = Arc::clone(&dao);
            thread::spawn(move || {
                for _ in 0..25 {
                    let listed = dao.list_by_volume_id(volume, None).unwrap();
                    assert_eq!(listed.len(), 5);
                    assert!(listed.iter().all(|s| s.volume_id == volume));

                    let first = volume * 10 + 1;
                    assert_eq!(dao.find_next_snapshot(first).unwrap().map(|s| s.id), Some(first + 1));
                    assert_eq!(dao.get_last_snapshot(volume, first + 4).unwrap(), Some(first + 3));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
