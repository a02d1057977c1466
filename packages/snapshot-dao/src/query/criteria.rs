// SearchCriteria - one parameterized instance of a Template
//
// Values are type-checked against the slot column when bound, so the only
// failure left for execution time is a required slot nobody bound.

use std::fmt;

use super::schema::{Column, Entity};
use super::template::{Op, Template};
use super::value::Value;
use crate::error::{Result, StorageError};

/// A slot with its bound values, ready for rendering
#[derive(Debug)]
pub(crate) struct BoundPredicate<'a, F> {
    pub field: F,
    pub op: Op,
    pub values: &'a [Value],
}

/// Bound copy of a `Template`
///
/// Created per call with `Template::create()`; not meant to be shared.
pub struct SearchCriteria<E: Entity, R = E> {
    template: Template<E, R>,
    bindings: Vec<Option<Vec<Value>>>,
}

impl<E: Entity, R> Clone for SearchCriteria<E, R> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            bindings: self.bindings.clone(),
        }
    }
}

impl<E: Entity, R> fmt::Debug for SearchCriteria<E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchCriteria")
            .field("template", &self.template.name())
            .field("bindings", &self.bindings)
            .finish()
    }
}

impl<E: Entity, R> SearchCriteria<E, R> {
    pub(crate) fn new(template: Template<E, R>) -> Self {
        let bindings = vec![None; template.slots().len()];
        Self { template, bindings }
    }

    pub fn template(&self) -> &Template<E, R> {
        &self.template
    }

    /// Bind a single value to slot `name`
    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.set_parameters(name, [value.into()])
    }

    /// Bind one or more values to slot `name`, replacing earlier values
    pub fn set_parameters<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let index = self
            .template
            .slot_index(name)
            .ok_or_else(|| StorageError::unknown_parameter(self.template.name(), name))?;
        let slot = &self.template.slots()[index];
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();

        if !slot.op.accepts_count(values.len()) {
            return Err(StorageError::type_mismatch(format!(
                "{}: parameter '{}' ({}) cannot take {} value(s)",
                self.template.name(),
                name,
                slot.op,
                values.len()
            )));
        }

        let column = slot.field;
        for value in &values {
            match value.field_type() {
                None if slot.op.accepts_null() && column.nullable() => {}
                None => {
                    return Err(StorageError::type_mismatch(format!(
                        "{}: parameter '{}' cannot be NULL (column '{}', operator {})",
                        self.template.name(),
                        name,
                        column.name(),
                        slot.op
                    )))
                }
                Some(found) if found != column.field_type() => {
                    return Err(StorageError::type_mismatch(format!(
                        "{}: parameter '{}' expects {}, got {}",
                        self.template.name(),
                        name,
                        column.field_type(),
                        found
                    )))
                }
                Some(_) => {}
            }
        }

        self.bindings[index] = Some(values);
        Ok(self)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.template
            .slot_index(name)
            .map(|i| self.bindings[i].is_some())
            .unwrap_or(false)
    }

    /// Bound predicates in slot order; unbound optional slots are skipped
    pub(crate) fn resolve(&self) -> Result<Vec<BoundPredicate<'_, E::Field>>> {
        let mut predicates = Vec::with_capacity(self.bindings.len());
        for (slot, binding) in self.template.slots().iter().zip(&self.bindings) {
            match binding {
                Some(values) => predicates.push(BoundPredicate {
                    field: slot.field,
                    op: slot.op,
                    values,
                }),
                None if slot.optional => {}
                None => {
                    return Err(StorageError::unbound_parameter(
                        self.template.name(),
                        &slot.name,
                    ))
                }
            }
        }
        Ok(predicates)
    }
}
