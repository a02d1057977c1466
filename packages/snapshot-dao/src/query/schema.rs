// Entity schema traits
//
// An entity names its table and enumerates its columns as tokens. Templates
// refer to columns only through these tokens, so a predicate can never
// target a column the table does not have.

use rusqlite::Row;
use std::fmt::Debug;
use std::hash::Hash;

use super::value::FieldType;
use crate::error::{Result, StorageError};

/// Column token of an entity table
pub trait Column: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// SQL column name
    fn name(self) -> &'static str;

    fn field_type(self) -> FieldType;

    fn nullable(self) -> bool;
}

/// Row type backed by one table
pub trait Entity: Sized + Send + 'static {
    type Field: Column;

    const TABLE: &'static str;

    /// Default ordering column
    const PRIMARY_KEY: Self::Field;

    /// Soft-delete marker; rows with a non-NULL value are hidden in live mode
    const REMOVED: Option<Self::Field>;

    /// All columns in `SELECT` order; `from_row` reads them by this index
    fn columns() -> &'static [Self::Field];

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Reject column tokens that are not part of the entity's column list
pub(crate) fn validate_field<E: Entity>(field: E::Field) -> Result<()> {
    if E::columns().contains(&field) {
        Ok(())
    } else {
        Err(StorageError::definition(format!(
            "Column '{}' is not declared on table '{}'",
            field.name(),
            E::TABLE
        )))
    }
}

/// Comma-separated column list for `SELECT`
pub(crate) fn select_list<E: Entity>() -> String {
    E::columns()
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}
