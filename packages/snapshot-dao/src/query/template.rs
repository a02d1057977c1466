// SearchBuilder / Template - reusable parameterized query shapes
//
// A builder collects named predicate slots (column + operator), AND-combined,
// and optionally one aggregate projection. `freeze()` turns it into a
// `Template`: immutable, cheap to clone, shareable across threads. Every
// query call then creates its own `SearchCriteria` from the template.
//
// Example:
// ```ignore
// let mut by_volume = SearchBuilder::<Snapshot>::new("VolumeIdSearch");
// by_volume.and("volume_id", SnapshotField::VolumeId, Op::Eq)?;
// let by_volume = by_volume.freeze();
//
// let mut last = SearchBuilder::<Snapshot>::new("LastSnapSearch")
//     .select::<i64>(Aggregate::Max, SnapshotField::Id)?;
// last.and("volume_id", SnapshotField::VolumeId, Op::Eq)?
//     .and("snap_id", SnapshotField::Id, Op::Neq)?;
// let last = last.freeze();
// ```

use rusqlite::Row;
use std::fmt;
use std::sync::Arc;

use super::criteria::SearchCriteria;
use super::schema::{validate_field, Column, Entity};
use super::value::{FieldType, Scalar};
use crate::error::{Result, StorageError};

/// Comparison operator of a predicate slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    In,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Neq => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Like => "LIKE",
            Op::In => "IN",
        }
    }

    /// Whether `count` bound values suit this operator
    pub(crate) fn accepts_count(&self, count: usize) -> bool {
        match self {
            Op::In => count >= 1,
            _ => count == 1,
        }
    }

    /// Eq/Neq against NULL render as IS NULL / IS NOT NULL
    pub(crate) fn accepts_null(&self) -> bool {
        matches!(self, Op::Eq | Op::Neq)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Aggregate function of a scalar template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Max,
    Min,
    Count,
    Sum,
}

impl Aggregate {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Aggregate::Max => "MAX",
            Aggregate::Min => "MIN",
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
        }
    }

    /// Type produced when applied to a column of type `column`
    pub fn result_type(&self, column: FieldType) -> Option<FieldType> {
        match self {
            Aggregate::Max | Aggregate::Min => Some(column),
            Aggregate::Count => Some(FieldType::Integer),
            Aggregate::Sum => (column == FieldType::Integer).then_some(FieldType::Integer),
        }
    }
}

/// One named predicate of a template
#[derive(Debug, Clone)]
pub(crate) struct PredicateSlot<F> {
    pub name: String,
    pub field: F,
    pub op: Op,
    pub optional: bool,
}

/// What a template's SELECT produces
#[derive(Debug, Clone, Copy)]
pub(crate) enum Selection<F> {
    Entity,
    Aggregate {
        func: Aggregate,
        field: F,
        group_by: Option<F>,
    },
}

/// Row decoder; `Ok(None)` is a NULL aggregate
pub(crate) type Decoder<R> = fn(&Row<'_>) -> rusqlite::Result<Option<R>>;

fn decode_entity<E: Entity>(row: &Row<'_>) -> rusqlite::Result<Option<E>> {
    E::from_row(row).map(Some)
}

fn decode_scalar<R: Scalar>(row: &Row<'_>) -> rusqlite::Result<Option<R>> {
    row.get::<_, Option<R>>(0)
}

struct TemplateInner<E: Entity, R> {
    name: String,
    slots: Vec<PredicateSlot<E::Field>>,
    selection: Selection<E::Field>,
    decode: Decoder<R>,
}

/// Frozen query template
///
/// `E` is the entity table, `R` the row type a query yields: `E` itself for
/// entity templates, the aggregate's scalar type otherwise.
pub struct Template<E: Entity, R = E> {
    inner: Arc<TemplateInner<E, R>>,
}

impl<E: Entity, R> Clone for Template<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity, R> fmt::Debug for Template<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.inner.name)
            .field("table", &E::TABLE)
            .field("slots", &self.inner.slots)
            .field("selection", &self.inner.selection)
            .finish()
    }
}

impl<E: Entity, R> Template<E, R> {
    /// New criteria with every slot unbound
    pub fn create(&self) -> SearchCriteria<E, R> {
        SearchCriteria::new(self.clone())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Slot names in registration order
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.inner.slots.iter().map(|s| s.name.as_str())
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self.inner.selection, Selection::Aggregate { .. })
    }

    /// Both handles come from the same `freeze()`
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn slots(&self) -> &[PredicateSlot<E::Field>] {
        &self.inner.slots
    }

    pub(crate) fn slot_index(&self, name: &str) -> Option<usize> {
        self.inner.slots.iter().position(|s| s.name == name)
    }

    pub(crate) fn selection(&self) -> Selection<E::Field> {
        self.inner.selection
    }

    pub(crate) fn decoder(&self) -> Decoder<R> {
        self.inner.decode
    }
}

/// Builder for a `Template`
pub struct SearchBuilder<E: Entity, R = E> {
    name: String,
    slots: Vec<PredicateSlot<E::Field>>,
    selection: Selection<E::Field>,
    decode: Decoder<R>,
    frozen: Option<Template<E, R>>,
}

impl<E: Entity, R> fmt::Debug for SearchBuilder<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchBuilder")
            .field("name", &self.name)
            .field("table", &E::TABLE)
            .field("slots", &self.slots)
            .field("selection", &self.selection)
            .field("frozen", &self.frozen.is_some())
            .finish()
    }
}

impl<E: Entity> SearchBuilder<E, E> {
    /// Entity template builder; queries yield full `E` rows
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slots: Vec::new(),
            selection: Selection::Entity,
            decode: decode_entity::<E>,
            frozen: None,
        }
    }

    /// Project a single aggregate instead of entity rows
    ///
    /// `R` must be the aggregate's result type: the column's own type for
    /// `Max`/`Min`, an integer for `Count`/`Sum`.
    pub fn select<R: Scalar>(self, func: Aggregate, field: E::Field) -> Result<SearchBuilder<E, R>> {
        self.ensure_open()?;
        validate_field::<E>(field)?;

        let produced = func.result_type(field.field_type()).ok_or_else(|| {
            StorageError::definition(format!(
                "{}: {} cannot be applied to {} column '{}'",
                self.name,
                func.as_sql(),
                field.field_type(),
                field.name()
            ))
        })?;
        if produced != R::FIELD_TYPE {
            return Err(StorageError::definition(format!(
                "{}: {}({}) yields {}, template result type is {}",
                self.name,
                func.as_sql(),
                field.name(),
                produced,
                R::FIELD_TYPE
            )));
        }

        Ok(SearchBuilder {
            name: self.name,
            slots: self.slots,
            selection: Selection::Aggregate {
                func,
                field,
                group_by: None,
            },
            decode: decode_scalar::<R>,
            frozen: None,
        })
    }
}

impl<E: Entity, R: Scalar> SearchBuilder<E, R> {
    /// Yield one aggregate per distinct value of `field`
    pub fn group_by(&mut self, field: E::Field) -> Result<&mut Self> {
        self.ensure_open()?;
        validate_field::<E>(field)?;

        match &mut self.selection {
            Selection::Aggregate { group_by, .. } if group_by.is_none() => *group_by = Some(field),
            Selection::Aggregate { .. } => {
                return Err(StorageError::definition(format!(
                    "{}: group_by already set",
                    self.name
                )))
            }
            Selection::Entity => {
                return Err(StorageError::definition(format!(
                    "{}: group_by needs an aggregate",
                    self.name
                )))
            }
        }
        Ok(self)
    }
}

impl<E: Entity, R> SearchBuilder<E, R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Register a required slot
    pub fn and(&mut self, name: impl Into<String>, field: E::Field, op: Op) -> Result<&mut Self> {
        self.push_slot(name.into(), field, op, false)
    }

    /// Register a slot that is skipped when left unbound
    pub fn and_optional(
        &mut self,
        name: impl Into<String>,
        field: E::Field,
        op: Op,
    ) -> Result<&mut Self> {
        self.push_slot(name.into(), field, op, true)
    }

    /// Finalize the template; later calls return the same template
    pub fn freeze(&mut self) -> Template<E, R> {
        if let Some(template) = &self.frozen {
            return template.clone();
        }

        let template = Template {
            inner: Arc::new(TemplateInner {
                name: self.name.clone(),
                slots: self.slots.clone(),
                selection: self.selection,
                decode: self.decode,
            }),
        };
        self.frozen = Some(template.clone());
        template
    }

    fn push_slot(&mut self, name: String, field: E::Field, op: Op, optional: bool) -> Result<&mut Self> {
        self.ensure_open()?;
        validate_field::<E>(field)?;

        if self.slots.iter().any(|s| s.name == name) {
            return Err(StorageError::definition(format!(
                "{}: duplicate parameter '{}'",
                self.name, name
            )));
        }
        if op == Op::Like && field.field_type() != FieldType::Text {
            return Err(StorageError::definition(format!(
                "{}: LIKE on {} column '{}'",
                self.name,
                field.field_type(),
                field.name()
            )));
        }

        self.slots.push(PredicateSlot {
            name,
            field,
            op,
            optional,
        });
        Ok(self)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.frozen.is_some() {
            Err(StorageError::definition(format!(
                "{}: template is frozen",
                self.name
            )))
        } else {
            Ok(())
        }
    }
}
