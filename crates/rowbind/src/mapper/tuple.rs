//! Positional tuple mapping.

use rowbind_core::convert::{ConverterSet, FromValue};
use rowbind_core::error::{Error, Result};
use rowbind_core::record::Record;

/// A tuple-like product type whose slots convert positionally from a row.
///
/// Implemented for tuples of one through eight [`FromValue`] elements.
pub trait RowTuple: Sized {
    /// Number of tuple slots.
    const ARITY: usize;

    /// Convert column `i` into slot `i` for every slot.
    fn from_record(record: &Record<'_>, converters: &ConverterSet) -> Result<Self>;
}

macro_rules! row_tuple {
    ($arity:literal; $($name:ident : $idx:tt),+) => {
        impl<$($name: FromValue + 'static),+> RowTuple for ($($name,)+) {
            const ARITY: usize = $arity;

            fn from_record(record: &Record<'_>, converters: &ConverterSet) -> Result<Self> {
                Ok((
                    $(
                        converters
                            .convert::<$name>(&record.value($idx))
                            .map_err(|e| match record.field_name($idx) {
                                Some(field) => e.with_field(field),
                                None => e,
                            })?,
                    )+
                ))
            }
        }
    };
}

row_tuple!(1; A: 0);
row_tuple!(2; A: 0, B: 1);
row_tuple!(3; A: 0, B: 1, C: 2);
row_tuple!(4; A: 0, B: 1, C: 2, D: 3);
row_tuple!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
row_tuple!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
row_tuple!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
row_tuple!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

/// Maps columns positionally: column `i` to tuple slot `i`.
///
/// Extra columns beyond the tuple's arity are ignored; a row with fewer
/// columns than slots is an argument error.
pub struct TupleMapper<T> {
    arity: usize,
    build: fn(&Record<'_>, &ConverterSet) -> Result<T>,
}

impl<T: RowTuple> TupleMapper<T> {
    pub fn new() -> Self {
        Self {
            arity: T::ARITY,
            build: T::from_record,
        }
    }
}

impl<T: RowTuple> Default for TupleMapper<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TupleMapper<T> {
    /// Map the record's current row into a tuple.
    pub fn create_instance(&self, record: &Record<'_>, converters: &ConverterSet) -> Result<T> {
        let width = record.field_count();
        if width < self.arity {
            return Err(Error::argument(format!(
                "result set has fewer fields ({width}) than the tuple has elements ({})",
                self.arity
            )));
        }
        (self.build)(record, converters)
    }
}
