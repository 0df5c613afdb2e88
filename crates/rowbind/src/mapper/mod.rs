//! Mapping strategies from a record to a typed entity.
//!
//! A [`Mapper`] is selected once per entity type at registry configuration
//! time and then invoked once per row. The variants:
//!
//! - [`PropertyMapper`]: binds named fields to entity properties
//! - [`TupleMapper`]: binds columns positionally to tuple slots
//! - [`ScalarMapper`]: converts column 0 to a single value type
//! - [`FnMapper`]: delegates to a caller-supplied row function

mod property;
mod scalar;
mod tuple;

pub use property::{Binding, Entity, PropertyMapper, PropertyMapperBuilder, SaveFn};
pub use scalar::{FnMapper, ScalarMapper};
pub use tuple::{RowTuple, TupleMapper};

use rowbind_core::convert::{ConverterSet, FromValue};
use rowbind_core::error::Result;
use rowbind_core::record::Record;

/// When a property binding requires its field to be present or non-null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    /// Absent fields are skipped; the property keeps its default value.
    #[default]
    Optional,
    /// The field must be present in the record.
    Required,
    /// The field must be present and hold a non-null value.
    NotNull,
}

/// Which direction an ignored property is excluded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreScope {
    /// Excluded from both reading and writing.
    Both,
    /// Excluded when binding rows into entities.
    OnLoad,
    /// Excluded when presenting entities as rows.
    OnSave,
}

impl IgnoreScope {
    /// Whether the scope excludes the property from row-to-entity binding.
    pub fn on_load(self) -> bool {
        matches!(self, IgnoreScope::Both | IgnoreScope::OnLoad)
    }

    /// Whether the scope excludes the property from entity-to-row output.
    pub fn on_save(self) -> bool {
        matches!(self, IgnoreScope::Both | IgnoreScope::OnSave)
    }
}

/// A mapping strategy for entity type `T`.
pub enum Mapper<T> {
    Properties(PropertyMapper<T>),
    Tuple(TupleMapper<T>),
    Scalar(ScalarMapper<T>),
    Function(FnMapper<T>),
}

impl<T> Mapper<T> {
    /// Map the record's current row into a new `T`.
    pub fn create_instance(&self, record: &Record<'_>, converters: &ConverterSet) -> Result<T> {
        match self {
            Mapper::Properties(m) => m.create_instance(record, converters),
            Mapper::Tuple(m) => m.create_instance(record, converters),
            Mapper::Scalar(m) => m.create_instance(record, converters),
            Mapper::Function(m) => m.create_instance(record),
        }
    }

    /// Wrap a caller-supplied row function.
    pub fn function(f: impl Fn(&Record<'_>) -> Result<T> + Send + Sync + 'static) -> Self {
        Mapper::Function(FnMapper::new(f))
    }

    /// Variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Mapper::Properties(_) => "properties",
            Mapper::Tuple(_) => "tuple",
            Mapper::Scalar(_) => "scalar",
            Mapper::Function(_) => "function",
        }
    }
}

impl<T: Entity> Mapper<T> {
    /// Property mapper with the entity's declared bindings and the default
    /// population condition.
    pub fn properties() -> Self {
        Mapper::Properties(PropertyMapper::with_defaults())
    }
}

impl<T: RowTuple> Mapper<T> {
    /// Positional tuple mapper.
    pub fn tuple() -> Self {
        Mapper::Tuple(TupleMapper::new())
    }
}

impl<T: FromValue + 'static> Mapper<T> {
    /// Single-column scalar mapper.
    pub fn scalar() -> Self {
        Mapper::Scalar(ScalarMapper::new())
    }
}
