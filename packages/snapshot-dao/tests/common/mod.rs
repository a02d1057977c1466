//! Shared fixtures for integration tests

#![allow(dead_code)]

use snapshot_dao::{Snapshot, SqliteStore, SNAPSHOTS_SCHEMA};

/// Install a test subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create the schema on `store` and insert `snapshots`
pub fn seed(store: &SqliteStore, snapshots: &[Snapshot]) {
    store.execute_batch(SNAPSHOTS_SCHEMA).unwrap();
    store
        .with_connection(|conn| {
            let mut stmt = conn.prepare(
                "INSERT INTO snapshots (id, volume_id, prev_snapshot_id, type_description, removed)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for s in snapshots {
                stmt.execute(rusqlite::params![
                    s.id,
                    s.volume_id,
                    s.prev_snapshot_id,
                    s.type_description,
                    s.removed
                ])?;
            }
            Ok(())
        })
        .unwrap();
}

/// In-memory store seeded with `snapshots`
pub fn seeded_store(snapshots: &[Snapshot]) -> SqliteStore {
    let store = SqliteStore::in_memory().unwrap();
    seed(&store, snapshots);
    store
}
