// QueryEngine - executes bound criteria against the store
//
// Every public operation funnels into `execute()` with an explicit
// `ExecutionMode`; live and including-removed queries differ only in the
// soft-delete condition added during rendering.

use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, trace, warn};

use super::criteria::SearchCriteria;
use super::filter::Filter;
use super::schema::Entity;
use super::sql::render;
use crate::error::{Result, StorageError};
use crate::infrastructure::SqliteStore;

/// Soft-delete handling of one query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Rows whose removed marker is unset
    Live,
    /// All rows, soft-deleted ones included
    IncludingRemoved,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Live => "live",
            ExecutionMode::IncludingRemoved => "including_removed",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic read-only DAO over one entity table
pub struct QueryEngine<E: Entity> {
    store: SqliteStore,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for QueryEngine<E> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<E: Entity> QueryEngine<E> {
    pub fn new(store: SqliteStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Live rows matching `criteria`
    pub fn list_by(
        &self,
        criteria: &SearchCriteria<E>,
        filter: Option<&Filter<E::Field>>,
    ) -> Result<Vec<E>> {
        self.execute(criteria, filter, ExecutionMode::Live)
    }

    /// All rows matching `criteria`, soft-deleted ones included
    pub fn list_including_removed_by(
        &self,
        criteria: &SearchCriteria<E>,
        filter: Option<&Filter<E::Field>>,
    ) -> Result<Vec<E>> {
        self.execute(criteria, filter, ExecutionMode::IncludingRemoved)
    }

    /// The single live row matching `criteria`
    ///
    /// # Errors
    ///
    /// `MultipleResults` if more than one row matches.
    pub fn find_one_by(&self, criteria: &SearchCriteria<E>) -> Result<Option<E>> {
        self.find_one(criteria, ExecutionMode::Live)
    }

    /// The single row matching `criteria`, soft-deleted rows included
    ///
    /// # Errors
    ///
    /// `MultipleResults` if more than one row matches.
    pub fn find_one_including_removed_by(&self, criteria: &SearchCriteria<E>) -> Result<Option<E>> {
        self.find_one(criteria, ExecutionMode::IncludingRemoved)
    }

    /// Live search; yields scalars for aggregate templates
    pub fn search<R>(
        &self,
        criteria: &SearchCriteria<E, R>,
        filter: Option<&Filter<E::Field>>,
    ) -> Result<Vec<R>> {
        self.execute(criteria, filter, ExecutionMode::Live)
    }

    /// Search over all rows; yields scalars for aggregate templates
    pub fn search_including_removed<R>(
        &self,
        criteria: &SearchCriteria<E, R>,
        filter: Option<&Filter<E::Field>>,
    ) -> Result<Vec<R>> {
        self.execute(criteria, filter, ExecutionMode::IncludingRemoved)
    }

    /// Execute `criteria` in `mode`
    ///
    /// NULL aggregate values (e.g. MAX over no rows) are dropped, so an
    /// aggregate with nothing to aggregate yields an empty vector.
    pub fn execute<R>(
        &self,
        criteria: &SearchCriteria<E, R>,
        filter: Option<&Filter<E::Field>>,
        mode: ExecutionMode,
    ) -> Result<Vec<R>> {
        self.run(criteria, filter, mode, None)
    }

    fn find_one(&self, criteria: &SearchCriteria<E>, mode: ExecutionMode) -> Result<Option<E>> {
        let mut rows = self.run(criteria, None, mode, Some(2))?;
        if rows.len() > 1 {
            warn!(
                template = criteria.template().name(),
                mode = %mode,
                "single-result query matched multiple rows"
            );
            return Err(StorageError::multiple_results(criteria.template().name()));
        }
        Ok(rows.pop())
    }

    fn run<R>(
        &self,
        criteria: &SearchCriteria<E, R>,
        filter: Option<&Filter<E::Field>>,
        mode: ExecutionMode,
        max_rows: Option<u64>,
    ) -> Result<Vec<R>> {
        let template = criteria.template();
        let stmt = render(criteria, filter, mode, max_rows)?;
        trace!(template = template.name(), sql = %stmt.sql, params = ?stmt.params, "rendered query");

        let rows = self
            .store
            .query(&stmt.sql, &stmt.params, template.decoder())?;
        let results: Vec<R> = rows.into_iter().flatten().collect();

        debug!(
            template = template.name(),
            table = E::TABLE,
            mode = %mode,
            rows = results.len(),
            "query executed"
        );
        Ok(results)
    }
}
