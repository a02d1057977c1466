//! SQLite store
//!
//! Shared connection handle; clones refer to the same connection. Each
//! query holds the connection lock only for its own statement. A panic while
//! the lock is held leaves the connection usable for later calls.

use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::query::template::Decoder;
use crate::query::Value;

/// SQLite-backed store handle
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open the database described by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        config.validate()?;

        let conn = match &config.path {
            Some(path) => {
                let flags = if config.read_only {
                    OpenFlags::SQLITE_OPEN_READ_ONLY
                        | OpenFlags::SQLITE_OPEN_URI
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX
                } else {
                    OpenFlags::default()
                };
                Connection::open_with_flags(path, flags)?
            }
            None => Connection::open_in_memory()?,
        };
        conn.busy_timeout(config.busy_timeout())?;

        info!(
            path = ?config.path,
            read_only = config.read_only,
            busy_timeout_ms = config.busy_timeout_ms,
            "snapshot store opened"
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        Self::open(&StoreConfig::default())
    }

    /// Run one or more `;`-separated statements (schema setup, fixtures)
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(sql)?;
        Ok(())
    }

    /// Borrow the connection for work outside the query layer
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let conn = self.lock();
        Ok(f(&conn)?)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            warn!("snapshot store lock poisoned by a panicked holder; recovering");
            self.conn.clear_poison();
            PoisonError::into_inner(poisoned)
        })
    }

    pub(crate) fn query<R>(
        &self,
        sql: &str,
        params: &[Value],
        decode: Decoder<R>,
    ) -> Result<Vec<Option<R>>> {
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| decode(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
