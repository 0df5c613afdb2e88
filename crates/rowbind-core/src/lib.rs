//! Core types for the rowbind binding engine.
//!
//! This crate holds the layers below the mapper family:
//!
//! - [`value`]: the dynamic [`Value`] type carried across the cursor boundary
//! - [`cursor`]: the [`RowCursor`] contract and an in-memory implementation
//! - [`record`]: the case-insensitive [`FieldIndex`] and per-row [`Record`] view
//! - [`convert`]: [`FromValue`] conversion rules and the [`ConverterSet`]
//! - [`error`]: the error taxonomy shared by every layer

pub mod convert;
pub mod cursor;
pub mod error;
pub mod record;
pub mod value;

pub use convert::{ConvertFn, ConverterSet, DbEnum, FromValue, Json};
pub use cursor::{MemoryCursor, RowCursor};
pub use error::{
    ArgumentError, BindingError, BindingErrorKind, ConfigError, ConfigErrorKind, CursorError,
    Error, Result,
};
pub use record::{FieldIndex, Record};
pub use value::Value;
