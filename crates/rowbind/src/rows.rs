//! Entity collections presented as rows for bulk-write paths.

use crate::mapper::{Binding, IgnoreScope, PropertyMapper};
use rowbind_core::convert::FromValue;
use rowbind_core::cursor::RowCursor;
use rowbind_core::error::{Error, Result};
use rowbind_core::record::FieldIndex;
use rowbind_core::value::Value;

/// A cursor-shaped view over an in-memory entity collection.
///
/// The field set is fixed at construction from a property mapper's
/// bindings, excluding properties ignored with scope `Both` or `OnSave`
/// (an `OnLoad` ignore does not affect writing). Per-row values pass
/// through each binding's save converter when one is set.
pub struct EntityRows<T> {
    entities: Vec<T>,
    bindings: Vec<Binding<T>>,
    index: FieldIndex,
    /// Row index plus one; zero means before the first row.
    position: usize,
    closed: bool,
}

impl<T> std::fmt::Debug for EntityRows<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRows")
            .field("bindings", &self.bindings)
            .field("position", &self.position)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl<T> EntityRows<T> {
    /// Build a row view over `entities` using the mapper's writable
    /// bindings.
    pub fn new(entities: Vec<T>, mapper: &PropertyMapper<T>) -> Self {
        let bindings: Vec<Binding<T>> = mapper
            .bindings()
            .iter()
            .filter(|b| !b.ignore_scope().is_some_and(IgnoreScope::on_save))
            .cloned()
            .collect();
        let index = FieldIndex::from_names(bindings.iter().map(Binding::field));
        Self {
            entities,
            bindings,
            index,
            position: 0,
            closed: false,
        }
    }

    /// Total number of entity rows.
    pub fn row_count(&self) -> usize {
        self.entities.len()
    }

    fn current(&self) -> Option<&T> {
        if self.closed || self.position == 0 {
            return None;
        }
        self.entities.get(self.position - 1)
    }

    /// Value at `ordinal` for the current row, surfacing converter faults.
    pub fn try_value(&self, ordinal: usize) -> Result<Value> {
        let Some(entity) = self.current() else {
            return Ok(Value::Null);
        };
        match self.bindings.get(ordinal) {
            Some(binding) => binding.load_from(entity),
            None => Ok(Value::Null),
        }
    }

    /// Value by field name. A name outside the writable field set is an
    /// argument error.
    pub fn value_named(&self, name: &str) -> Result<Value> {
        let ordinal = self
            .index
            .ordinal(name)
            .ok_or_else(|| Error::argument(format!("no writable field named '{name}'")))?;
        self.try_value(ordinal)
    }

    /// Typed value at `ordinal` for the current row.
    pub fn get<V: FromValue>(&self, ordinal: usize) -> Result<V> {
        let value = self.try_value(ordinal)?;
        V::from_value(&value).map_err(|e| match self.index.name(ordinal) {
            Some(field) => e.with_field(field),
            None => e,
        })
    }
}

impl<T: Send + Sync> RowCursor for EntityRows<T> {
    fn field_count(&self) -> usize {
        self.bindings.len()
    }

    fn field_name(&self, ordinal: usize) -> Option<&str> {
        self.index.name(ordinal)
    }

    fn value(&self, ordinal: usize) -> Value {
        match self.try_value(ordinal) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(ordinal, error = %err, "entity row value fault");
                Value::Null
            }
        }
    }

    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }
        if self.position >= self.entities.len() {
            self.closed = true;
            return Ok(false);
        }
        self.position += 1;
        Ok(true)
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
