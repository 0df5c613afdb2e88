//! Single-column and function mappers.

use rowbind_core::convert::{ConverterSet, FromValue};
use rowbind_core::error::Result;
use rowbind_core::record::Record;
use std::sync::Arc;

/// Converts column 0 of each row to a single value type.
///
/// Used transparently when a query's result type is a primitive or value
/// type rather than a composite entity.
pub struct ScalarMapper<T> {
    convert: fn(&Record<'_>, &ConverterSet) -> Result<T>,
}

fn convert_first<T: FromValue + 'static>(
    record: &Record<'_>,
    converters: &ConverterSet,
) -> Result<T> {
    let result = converters.convert::<T>(&record.value(0));
    match record.field_name(0) {
        Some(field) => result.map_err(|e| e.with_field(field)),
        None => result,
    }
}

impl<T: FromValue + 'static> ScalarMapper<T> {
    pub fn new() -> Self {
        Self {
            convert: convert_first::<T>,
        }
    }
}

impl<T: FromValue + 'static> Default for ScalarMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScalarMapper<T> {
    pub fn create_instance(&self, record: &Record<'_>, converters: &ConverterSet) -> Result<T> {
        (self.convert)(record, converters)
    }
}

/// Wraps a caller-supplied row-to-entity function.
pub struct FnMapper<T> {
    f: Arc<dyn Fn(&Record<'_>) -> Result<T> + Send + Sync>,
}

impl<T> FnMapper<T> {
    pub fn new(f: impl Fn(&Record<'_>) -> Result<T> + Send + Sync + 'static) -> Self {
        Self { f: Arc::new(f) }
    }

    pub fn create_instance(&self, record: &Record<'_>) -> Result<T> {
        (self.f)(record)
    }
}
