//! Mapper registry: one mapper per entity type, per connector instance.

use crate::mapper::{Entity, Mapper, PropertyMapperBuilder, RowTuple};
use crate::reader::EntityReader;
use crate::rows::EntityRows;
use rowbind_core::convert::{ConverterSet, FromValue};
use rowbind_core::cursor::RowCursor;
use rowbind_core::error::{ConfigErrorKind, Error, Result};
use rowbind_core::value::Value;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A type with a default mapping strategy.
///
/// Built-in value types (and their `Option` forms) map as scalars; entity
/// types declared through [`bindings!`](crate::bindings) map by property.
/// Tuples opt in per query via [`MapperRegistry::configure`] or
/// [`Mapper::tuple`] since a blanket registration would conflict with
/// entity types.
pub trait Bindable: Send + Sync + Sized + 'static {
    fn default_mapper() -> Mapper<Self>;
}

macro_rules! scalar_bindable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Bindable for $ty {
                fn default_mapper() -> Mapper<Self> {
                    Mapper::scalar()
                }
            }
        )+
    };
}

scalar_bindable!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, char, Vec<u8>, [u8; 16], Value,
);

impl<T> Bindable for Option<T>
where
    T: FromValue + Send + Sync + 'static,
{
    fn default_mapper() -> Mapper<Self> {
        Mapper::scalar()
    }
}

macro_rules! tuple_bindable {
    ($($name:ident),+) => {
        impl<$($name),+> Bindable for ($($name,)+)
        where
            $($name: FromValue + Send + Sync + 'static),+
        {
            fn default_mapper() -> Mapper<Self> {
                Mapper::tuple()
            }
        }
    };
}

tuple_bindable!(A);
tuple_bindable!(A, B);
tuple_bindable!(A, B, C);
tuple_bindable!(A, B, C, D);
tuple_bindable!(A, B, C, D, E);
tuple_bindable!(A, B, C, D, E, F);
tuple_bindable!(A, B, C, D, E, F, G);
tuple_bindable!(A, B, C, D, E, F, G, H);

/// Table from entity type to its configured [`Mapper`], plus the shared
/// custom converter table.
///
/// One registry per connector instance. Configuration is expected to finish
/// before querying begins; the registry still guards its tables so that a
/// concurrent first use of an unconfigured type auto-registers exactly once.
pub struct MapperRegistry {
    mappers: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    converters: RwLock<Arc<ConverterSet>>,
}

impl MapperRegistry {
    /// Registry pre-seeded with scalar mappers for the built-in value types
    /// and their optional forms.
    pub fn new() -> Self {
        let registry = Self {
            mappers: RwLock::new(HashMap::new()),
            converters: RwLock::new(Arc::new(ConverterSet::new())),
        };
        registry.seed_scalars();
        registry
    }

    fn seed_scalars(&self) {
        macro_rules! seed {
            ($($ty:ty),+ $(,)?) => {
                $(
                    self.insert_mapper(Mapper::<$ty>::scalar());
                    self.insert_mapper(Mapper::<Option<$ty>>::scalar());
                )+
            };
        }
        seed!(
            bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, char, Vec<u8>, [u8; 16],
        );
        self.insert_mapper(Mapper::<Value>::scalar());
    }

    fn insert_mapper<T: Send + Sync + 'static>(&self, mapper: Mapper<T>) {
        if let Ok(mut mappers) = self.mappers.write() {
            mappers.insert(TypeId::of::<T>(), Arc::new(Arc::new(mapper)));
        }
    }

    fn lookup<T: Send + Sync + 'static>(&self) -> Option<Arc<Mapper<T>>> {
        let mappers = self.mappers.read().ok()?;
        mappers
            .get(&TypeId::of::<T>())
            .and_then(|erased| erased.downcast_ref::<Arc<Mapper<T>>>())
            .cloned()
    }

    /// Register the mapper for `T`. Fails if `T` is already configured.
    pub fn configure<T: Send + Sync + 'static>(&self, mapper: Mapper<T>) -> Result<()> {
        let mut mappers = self
            .mappers
            .write()
            .map_err(|_| Error::argument("mapper registry lock poisoned"))?;
        if mappers.contains_key(&TypeId::of::<T>()) {
            return Err(Error::config(
                ConfigErrorKind::DuplicateMapper,
                format!("a mapper is already registered for {}", type_name::<T>()),
            ));
        }
        tracing::debug!(entity = type_name::<T>(), kind = mapper.kind(), "mapper registered");
        mappers.insert(TypeId::of::<T>(), Arc::new(Arc::new(mapper)));
        Ok(())
    }

    /// Configure a property mapper for `T` through its builder.
    pub fn configure_entity<T: Entity>(
        &self,
        configure: impl FnOnce(PropertyMapperBuilder<T>) -> PropertyMapperBuilder<T>,
    ) -> Result<()> {
        let mapper = configure(PropertyMapperBuilder::new()).build_mapper()?;
        self.configure(mapper)
    }

    /// Like [`configure_entity`](Self::configure_entity), with every
    /// binding seeded to `condition` instead of `Optional`.
    pub fn configure_entity_with<T: Entity>(
        &self,
        condition: crate::mapper::Condition,
        configure: impl FnOnce(PropertyMapperBuilder<T>) -> PropertyMapperBuilder<T>,
    ) -> Result<()> {
        let builder = PropertyMapperBuilder::with_condition(condition);
        self.configure(configure(builder).build_mapper()?)
    }

    /// Configure a function mapper for `T`.
    pub fn configure_fn<T: Send + Sync + 'static>(
        &self,
        f: impl Fn(&rowbind_core::record::Record<'_>) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        self.configure(Mapper::function(f))
    }

    /// Fetch the mapper for `T`, auto-registering the type's default
    /// mapping strategy on first use.
    pub fn get<T: Bindable>(&self) -> Arc<Mapper<T>> {
        if let Some(mapper) = self.lookup::<T>() {
            return mapper;
        }
        let mapper = Arc::new(T::default_mapper());
        if let Ok(mut mappers) = self.mappers.write() {
            // Another thread may have won the race; keep the first entry.
            let entry = mappers
                .entry(TypeId::of::<T>())
                .or_insert_with(|| {
                    tracing::debug!(entity = type_name::<T>(), "mapper auto-registered");
                    Arc::new(mapper.clone())
                });
            if let Some(existing) = entry.downcast_ref::<Arc<Mapper<T>>>() {
                return existing.clone();
            }
        }
        mapper
    }

    /// Check whether a mapper is registered for `T`.
    pub fn has_mapper<T: 'static>(&self) -> bool {
        self.mappers
            .read()
            .map(|m| m.contains_key(&TypeId::of::<T>()))
            .unwrap_or(false)
    }

    /// Register a custom value converter for target type `T`, consulted by
    /// property and tuple mappers before the standard conversion rules.
    /// Fails if a converter for `T` is already registered.
    pub fn add_converter<T: 'static>(
        &self,
        f: impl Fn(&Value) -> Result<T> + Send + Sync + 'static,
    ) -> Result<()> {
        let mut guard = self
            .converters
            .write()
            .map_err(|_| Error::argument("converter table lock poisoned"))?;
        if guard.contains::<T>() {
            return Err(Error::config(
                ConfigErrorKind::DuplicateConverter,
                format!("a value converter is already registered for {}", type_name::<T>()),
            ));
        }
        let mut next = ConverterSet::clone(&guard);
        next.insert(f);
        tracing::debug!(target_type = type_name::<T>(), "value converter registered");
        *guard = Arc::new(next);
        Ok(())
    }

    /// Check whether a custom converter is registered for `T`.
    pub fn has_converter<T: 'static>(&self) -> bool {
        self.converters
            .read()
            .map(|c| c.contains::<T>())
            .unwrap_or(false)
    }

    /// Snapshot of the current converter table.
    pub fn converters(&self) -> Arc<ConverterSet> {
        self.converters
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Lazy reader over `cursor`, mapping each row to a `T`.
    pub fn reader<T: Bindable, C: RowCursor>(&self, cursor: C) -> EntityReader<C, T> {
        EntityReader::new(cursor, self.get::<T>(), self.converters())
    }

    /// Eagerly materialize every row of `cursor` into a vector.
    pub fn load<T: Bindable, C: RowCursor>(&self, cursor: C) -> Result<Vec<T>> {
        self.reader::<T, C>(cursor).collect()
    }

    /// Present `entities` as rows using `T`'s property mapper.
    ///
    /// Fails unless the registered mapper for `T` is a property mapper.
    pub fn entity_rows<T: Bindable>(&self, entities: Vec<T>) -> Result<EntityRows<T>> {
        let mapper = self.get::<T>();
        match mapper.as_ref() {
            Mapper::Properties(properties) => Ok(EntityRows::new(entities, properties)),
            other => Err(Error::config(
                ConfigErrorKind::NotPropertyMapper,
                format!(
                    "{} is mapped by a {} mapper; row adaptation needs a property mapper",
                    type_name::<T>(),
                    other.kind()
                ),
            )),
        }
    }
}

impl Default for MapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mappers = self.mappers.read().map(|m| m.len()).unwrap_or(0);
        let converters = self.converters.read().map(|c| c.len()).unwrap_or(0);
        f.debug_struct("MapperRegistry")
            .field("mappers", &mappers)
            .field("converters", &converters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbind_core::cursor::MemoryCursor;
    use rowbind_core::record::Record;

    #[derive(Debug, Default, PartialEq)]
    struct Widget {
        id: i32,
        label: String,
    }

    crate::bindings!(Widget { id, label });

    #[test]
    fn scalars_are_pre_seeded() {
        let registry = MapperRegistry::new();
        assert!(registry.has_mapper::<i32>());
        assert!(registry.has_mapper::<Option<i32>>());
        assert!(registry.has_mapper::<String>());
        assert!(registry.has_mapper::<[u8; 16]>());
        assert!(!registry.has_mapper::<Widget>());
    }

    #[test]
    fn get_auto_registers_entities() {
        let registry = MapperRegistry::new();
        let mapper = registry.get::<Widget>();
        assert_eq!(mapper.kind(), "properties");
        assert!(registry.has_mapper::<Widget>());
    }

    #[test]
    fn reconfiguring_a_type_is_rejected() {
        let registry = MapperRegistry::new();
        registry
            .configure_entity::<Widget>(|b| b.map("label", "name"))
            .unwrap();
        let err = registry
            .configure_entity::<Widget>(|b| b)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(c) if c.kind == ConfigErrorKind::DuplicateMapper
        ));
    }

    #[test]
    fn builder_errors_surface_through_configure() {
        let registry = MapperRegistry::new();
        let err = registry
            .configure_entity::<Widget>(|b| b.map("nope", "x"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(c) if c.kind == ConfigErrorKind::UnknownProperty
        ));
        // Nothing was registered, so configuration can be retried.
        assert!(!registry.has_mapper::<Widget>());
    }

    #[test]
    fn configure_with_condition_applies_to_every_binding() {
        use crate::mapper::Condition;
        let registry = MapperRegistry::new();
        registry
            .configure_entity_with::<Widget>(Condition::NotNull, |b| b)
            .unwrap();
        let cursor = MemoryCursor::new(
            ["id", "label"],
            vec![vec![Value::Int(1), Value::Null]],
        );
        assert!(registry.load::<Widget, _>(cursor).is_err());
    }

    #[test]
    fn duplicate_converter_is_rejected() {
        let registry = MapperRegistry::new();
        registry.add_converter::<i32>(|v| i32::from_value(v)).unwrap();
        assert!(registry.has_converter::<i32>());
        let err = registry
            .add_converter::<i32>(|v| i32::from_value(v))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(c) if c.kind == ConfigErrorKind::DuplicateConverter
        ));
    }

    #[test]
    fn converter_snapshot_is_isolated_from_later_registration() {
        let registry = MapperRegistry::new();
        let before = registry.converters();
        registry.add_converter::<i32>(|v| i32::from_value(v)).unwrap();
        assert!(!before.contains::<i32>());
        assert!(registry.converters().contains::<i32>());
    }

    #[test]
    fn load_materializes_all_rows() {
        let registry = MapperRegistry::new();
        let cursor = MemoryCursor::new(
            ["id", "label"],
            vec![
                vec![Value::Int(1), Value::Text("a".to_string())],
                vec![Value::Int(2), Value::Text("b".to_string())],
            ],
        );
        let widgets: Vec<Widget> = registry.load(cursor).unwrap();
        assert_eq!(
            widgets,
            vec![
                Widget { id: 1, label: "a".to_string() },
                Widget { id: 2, label: "b".to_string() },
            ]
        );
    }

    #[test]
    fn scalar_query_through_registry() {
        let registry = MapperRegistry::new();
        let cursor = MemoryCursor::new(["n"], vec![vec![Value::Int(4)], vec![Value::Null]]);
        let values: Vec<i32> = registry.load(cursor).unwrap();
        assert_eq!(values, vec![4, 0]);
    }

    #[test]
    fn tuple_query_through_registry() {
        let registry = MapperRegistry::new();
        let cursor = MemoryCursor::new(
            ["a", "b"],
            vec![vec![Value::Int(1), Value::Text("x".to_string())]],
        );
        let rows: Vec<(i32, String)> = registry.load(cursor).unwrap();
        assert_eq!(rows, vec![(1, "x".to_string())]);
    }

    #[test]
    fn function_mapper_through_registry() {
        let registry = MapperRegistry::new();
        registry
            .configure_fn(|rec: &Record<'_>| Ok(Widget {
                id: rec.get_named::<i32>("id")?,
                label: "fixed".to_string(),
            }))
            .unwrap();
        let cursor = MemoryCursor::new(["id"], vec![vec![Value::Int(8)]]);
        let widgets: Vec<Widget> = registry.load(cursor).unwrap();
        assert_eq!(widgets[0], Widget { id: 8, label: "fixed".to_string() });
    }

    #[test]
    fn entity_rows_requires_property_mapper() {
        let registry = MapperRegistry::new();
        let err = registry.entity_rows::<i32>(vec![1, 2]).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(c) if c.kind == ConfigErrorKind::NotPropertyMapper
        ));
    }
}
