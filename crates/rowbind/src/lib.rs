//! rowbind: a record-to-entity binding engine for relational database
//! clients.
//!
//! The crate sits between a driver's row cursor and the caller's typed
//! entities. A [`MapperRegistry`] holds one [`Mapper`] per entity type;
//! queries pull rows through an [`EntityReader`], and bulk-write paths
//! present entity collections as rows through [`EntityRows`].
//!
//! ```
//! use rowbind::{MapperRegistry, MemoryCursor, Value};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Person {
//!     id: i32,
//!     name: String,
//! }
//!
//! rowbind::bindings!(Person { id, name });
//!
//! let registry = MapperRegistry::new();
//! let cursor = MemoryCursor::new(
//!     ["id", "name"],
//!     vec![vec![Value::Int(1), Value::Text("Ada".to_string())]],
//! );
//! let people: Vec<Person> = registry.load(cursor).unwrap();
//! assert_eq!(people[0].name, "Ada");
//! ```

pub mod mapper;
pub mod reader;
pub mod registry;
pub mod rows;

pub use mapper::{
    Binding, Condition, Entity, FnMapper, IgnoreScope, Mapper, PropertyMapper,
    PropertyMapperBuilder, RowTuple, SaveFn, ScalarMapper, TupleMapper,
};
pub use reader::EntityReader;
pub use registry::{Bindable, MapperRegistry};
pub use rows::EntityRows;

pub use rowbind_core::convert::{ConvertFn, ConverterSet, DbEnum, FromValue, Json};
pub use rowbind_core::cursor::{MemoryCursor, RowCursor};
pub use rowbind_core::error::{
    ArgumentError, BindingError, BindingErrorKind, ConfigError, ConfigErrorKind, CursorError,
    Error, Result,
};
pub use rowbind_core::record::{FieldIndex, Record};
pub use rowbind_core::value::Value;

pub use rowbind_core::db_enum;
