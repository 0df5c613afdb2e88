//! Field-to-property binding and the property mapper.

use super::{Condition, IgnoreScope, Mapper};
use rowbind_core::convert::{ConvertFn, ConverterSet, FromValue};
use rowbind_core::error::{BindingError, BindingErrorKind, ConfigErrorKind, Error, Result};
use rowbind_core::record::Record;
use rowbind_core::value::Value;
use std::any::Any;
use std::sync::Arc;

/// A caller-supplied entity-to-value converter for the write direction.
pub type SaveFn<F> = Arc<dyn Fn(&F) -> Value + Send + Sync>;

type ApplyFn<T> = Arc<
    dyn Fn(&mut T, &Value, &ConverterSet, Option<&Arc<dyn Any + Send + Sync>>) -> Result<()>
        + Send
        + Sync,
>;
type LoadFn<T> = Arc<dyn Fn(&T, Option<&Arc<dyn Any + Send + Sync>>) -> Result<Value> + Send + Sync>;
type AfterBind<T> = Arc<dyn Fn(&Record<'_>, &mut T) + Send + Sync>;

/// An entity type whose properties can be bound to record fields.
///
/// Usually implemented through the [`bindings!`](crate::bindings) macro,
/// which generates one [`Binding`] per listed field.
pub trait Entity: Default + Send + Sync + Sized + 'static {
    /// The default bindings, one per writable property, each bound to a
    /// field of the property's own name.
    fn bindings() -> Vec<Binding<Self>>;
}

/// One field-to-property binding.
///
/// The property's value type is erased at construction; the stored closures
/// carry it, so the binding list stays homogeneous per entity type.
pub struct Binding<T> {
    property: &'static str,
    field: String,
    condition: Condition,
    ignore: Option<IgnoreScope>,
    target_type: &'static str,
    load_convert: Option<Arc<dyn Any + Send + Sync>>,
    save_convert: Option<Arc<dyn Any + Send + Sync>>,
    apply: ApplyFn<T>,
    load: LoadFn<T>,
}

impl<T> Binding<T> {
    /// Bind the property accessed by `get`/`set` to a field of the
    /// property's own name.
    pub fn new<F>(
        property: &'static str,
        get: impl Fn(&T) -> F + Send + Sync + 'static,
        set: impl Fn(&mut T, F) + Send + Sync + 'static,
    ) -> Self
    where
        F: FromValue + Into<Value> + 'static,
    {
        let target_type = std::any::type_name::<F>();

        let apply: ApplyFn<T> = Arc::new(move |entity, value, converters, custom| {
            let converted: F = match custom {
                Some(slot) => {
                    let f = slot.downcast_ref::<ConvertFn<F>>().ok_or_else(|| {
                        Error::config(
                            ConfigErrorKind::ConverterTypeMismatch,
                            format!(
                                "converter registered for property '{property}' does not produce {target_type}"
                            ),
                        )
                    })?;
                    f(value)?
                }
                None => converters.convert::<F>(value)?,
            };
            set(entity, converted);
            Ok(())
        });

        let load: LoadFn<T> = Arc::new(move |entity, custom| {
            let current = get(entity);
            match custom {
                Some(slot) => {
                    let f = slot.downcast_ref::<SaveFn<F>>().ok_or_else(|| {
                        Error::config(
                            ConfigErrorKind::ConverterTypeMismatch,
                            format!(
                                "save converter registered for property '{property}' does not accept {target_type}"
                            ),
                        )
                    })?;
                    Ok(f(&current))
                }
                None => Ok(current.into()),
            }
        });

        Self {
            property,
            field: property.to_string(),
            condition: Condition::Optional,
            ignore: None,
            target_type,
            load_convert: None,
            save_convert: None,
            apply,
            load,
        }
    }

    /// The property name this binding populates.
    pub fn property(&self) -> &'static str {
        self.property
    }

    /// The record field name this binding reads.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The binding's population condition.
    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// The ignore scope, if the property is ignored.
    pub fn ignore_scope(&self) -> Option<IgnoreScope> {
        self.ignore
    }

    /// Convert `value` and assign it to the entity's property.
    pub fn apply_to(&self, entity: &mut T, value: &Value, converters: &ConverterSet) -> Result<()> {
        (self.apply)(entity, value, converters, self.load_convert.as_ref())
            .map_err(|e| e.with_field(&self.field))
    }

    /// Read the property back out of the entity as a database value,
    /// through the save converter if one is set.
    pub fn load_from(&self, entity: &T) -> Result<Value> {
        (self.load)(entity, self.save_convert.as_ref())
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            property: self.property,
            field: self.field.clone(),
            condition: self.condition,
            ignore: self.ignore,
            target_type: self.target_type,
            load_convert: self.load_convert.clone(),
            save_convert: self.save_convert.clone(),
            apply: self.apply.clone(),
            load: self.load.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("property", &self.property)
            .field("field", &self.field)
            .field("condition", &self.condition)
            .field("ignore", &self.ignore)
            .field("target_type", &self.target_type)
            .finish_non_exhaustive()
    }
}

/// Implement [`Entity`] for a struct by listing its bindable fields.
///
/// Each field must be `Default + Clone`, convert from a database value, and
/// convert into one. The field's own name becomes its record field name;
/// remapping happens at configuration time.
///
/// ```
/// #[derive(Default)]
/// struct Person {
///     id: i32,
///     name: String,
///     title: Option<String>,
/// }
///
/// rowbind::bindings!(Person { id, name, title });
/// ```
#[macro_export]
macro_rules! bindings {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::mapper::Entity for $ty {
            fn bindings() -> Vec<$crate::mapper::Binding<Self>> {
                vec![
                    $(
                        $crate::mapper::Binding::new(
                            stringify!($field),
                            |e: &Self| e.$field.clone(),
                            |e: &mut Self, v| e.$field = v,
                        )
                    ),+
                ]
            }
        }

        impl $crate::registry::Bindable for $ty {
            fn default_mapper() -> $crate::mapper::Mapper<Self> {
                $crate::mapper::Mapper::properties()
            }
        }
    };
}

/// Maps record fields to entity properties by name.
///
/// Immutable once built; configuration happens in
/// [`PropertyMapperBuilder`].
pub struct PropertyMapper<T> {
    factory: Arc<dyn Fn() -> T + Send + Sync>,
    bindings: Vec<Binding<T>>,
    after_bind: Option<AfterBind<T>>,
}

impl<T: Entity> PropertyMapper<T> {
    /// Mapper with the entity's declared bindings, all `Optional`.
    pub fn with_defaults() -> Self {
        Self {
            factory: Arc::new(T::default),
            bindings: T::bindings(),
            after_bind: None,
        }
    }

    /// Start configuring a mapper for `T`.
    pub fn builder() -> PropertyMapperBuilder<T> {
        PropertyMapperBuilder::new()
    }
}

impl<T> std::fmt::Debug for PropertyMapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyMapper")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl<T> PropertyMapper<T> {
    /// The configured bindings, in declaration order.
    pub fn bindings(&self) -> &[Binding<T>] {
        &self.bindings
    }

    /// Map the record's current row into a new entity.
    pub fn create_instance(&self, record: &Record<'_>, converters: &ConverterSet) -> Result<T> {
        let mut entity = (self.factory)();
        for binding in &self.bindings {
            if binding.ignore.is_some_and(IgnoreScope::on_load) {
                continue;
            }
            let value = match record.ordinal(&binding.field) {
                Some(ordinal) => record.value(ordinal),
                None => match binding.condition {
                    Condition::Required => {
                        return Err(Error::Binding(BindingError {
                            kind: BindingErrorKind::MissingField,
                            field: Some(binding.field.clone()),
                            value: "absent".to_string(),
                            target: binding.target_type,
                        }));
                    }
                    // An absent field reads as null, which NotNull rejects.
                    Condition::NotNull => Value::Null,
                    Condition::Optional => continue,
                },
            };
            if binding.condition == Condition::NotNull && value.is_null() {
                return Err(Error::Binding(BindingError {
                    kind: BindingErrorKind::NullViolation,
                    field: Some(binding.field.clone()),
                    value: value.describe(),
                    target: binding.target_type,
                }));
            }
            binding.apply_to(&mut entity, &value, converters)?;
        }
        if let Some(after) = &self.after_bind {
            after(record, &mut entity);
        }
        Ok(entity)
    }
}

/// Configures a [`PropertyMapper`] before first use.
///
/// Configuration errors are collected and surfaced by [`build`], so calls
/// chain without intermediate results.
///
/// [`build`]: PropertyMapperBuilder::build
pub struct PropertyMapperBuilder<T> {
    bindings: Vec<Binding<T>>,
    after_bind: Option<AfterBind<T>>,
    errors: Vec<Error>,
}

impl<T: Entity> PropertyMapperBuilder<T> {
    /// Builder seeded with the entity's declared bindings, all `Optional`.
    pub fn new() -> Self {
        Self::with_condition(Condition::Optional)
    }

    /// Builder with every binding set to `condition`.
    pub fn with_condition(condition: Condition) -> Self {
        let mut bindings = T::bindings();
        for binding in &mut bindings {
            binding.condition = condition;
        }
        Self {
            bindings,
            after_bind: None,
            errors: Vec::new(),
        }
    }
}

impl<T: Entity> Default for PropertyMapperBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PropertyMapperBuilder<T> {
    fn binding_mut(&mut self, property: &str) -> Option<&mut Binding<T>> {
        let found = self.bindings.iter_mut().find(|b| b.property == property);
        if found.is_none() {
            self.errors.push(Error::config(
                ConfigErrorKind::UnknownProperty,
                format!("no bindable property named '{property}'"),
            ));
        }
        found
    }

    /// Remap `property` to read from `field` instead of its own name.
    ///
    /// Claiming a field already mapped to another property is a
    /// configuration error.
    #[must_use]
    pub fn map(mut self, property: &str, field: &str) -> Self {
        let claimed = self
            .bindings
            .iter()
            .any(|b| b.property != property && b.field.eq_ignore_ascii_case(field));
        if claimed {
            self.errors.push(Error::config(
                ConfigErrorKind::DuplicateField,
                format!("field '{field}' is already mapped to another property"),
            ));
            return self;
        }
        if let Some(binding) = self.binding_mut(property) {
            binding.field = field.to_string();
        }
        self
    }

    /// Attach a per-property value converter for the read direction.
    ///
    /// `F` must be the property's value type; a mismatch surfaces as a
    /// configuration error when the mapper first binds a row.
    #[must_use]
    pub fn convert_with<F: 'static>(
        mut self,
        property: &str,
        f: impl Fn(&Value) -> Result<F> + Send + Sync + 'static,
    ) -> Self {
        if let Some(binding) = self.binding_mut(property) {
            let erased: Arc<dyn Any + Send + Sync> = Arc::new(Arc::new(f) as ConvertFn<F>);
            binding.load_convert = Some(erased);
        }
        self
    }

    /// Attach a per-property converter for the write direction.
    #[must_use]
    pub fn save_with<F: 'static>(
        mut self,
        property: &str,
        f: impl Fn(&F) -> Value + Send + Sync + 'static,
    ) -> Self {
        if let Some(binding) = self.binding_mut(property) {
            let erased: Arc<dyn Any + Send + Sync> = Arc::new(Arc::new(f) as SaveFn<F>);
            binding.save_convert = Some(erased);
        }
        self
    }

    /// Override the population condition for one property.
    #[must_use]
    pub fn condition(mut self, property: &str, condition: Condition) -> Self {
        if let Some(binding) = self.binding_mut(property) {
            binding.condition = condition;
        }
        self
    }

    /// Mark a property ignored within the given scope.
    #[must_use]
    pub fn ignore(mut self, property: &str, scope: IgnoreScope) -> Self {
        if let Some(binding) = self.binding_mut(property) {
            binding.ignore = Some(scope);
        }
        self
    }

    /// Attach a callback invoked with the record and the new entity after
    /// all properties are set.
    #[must_use]
    pub fn after_bind(mut self, f: impl Fn(&Record<'_>, &mut T) + Send + Sync + 'static) -> Self {
        self.after_bind = Some(Arc::new(f));
        self
    }

    /// Finish configuration, surfacing the first collected error.
    pub fn build(mut self) -> Result<PropertyMapper<T>>
    where
        T: Entity,
    {
        if !self.errors.is_empty() {
            return Err(self.errors.remove(0));
        }
        Ok(PropertyMapper {
            factory: Arc::new(T::default),
            bindings: self.bindings,
            after_bind: self.after_bind,
        })
    }

    /// Like [`build`](Self::build), wrapped as a [`Mapper`].
    pub fn build_mapper(self) -> Result<Mapper<T>>
    where
        T: Entity,
    {
        self.build().map(Mapper::Properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowbind_core::cursor::{MemoryCursor, RowCursor};
    use rowbind_core::record::FieldIndex;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i32,
        name: String,
        title: Option<String>,
    }

    crate::bindings!(Person { id, name, title });

    fn record_fixture(fields: &[&str], row: Vec<Value>) -> (MemoryCursor, FieldIndex) {
        let mut cursor = MemoryCursor::new(fields.iter().copied(), vec![row]);
        cursor.advance().unwrap();
        let index = FieldIndex::from_cursor(&cursor);
        (cursor, index)
    }

    #[test]
    fn binds_fields_by_name() {
        let (cursor, index) = record_fixture(
            &["id", "name", "title"],
            vec![
                Value::Int(3),
                Value::Text("Ada".to_string()),
                Value::Null,
            ],
        );
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::with_defaults();
        let person = mapper.create_instance(&record, &ConverterSet::new()).unwrap();
        assert_eq!(
            person,
            Person {
                id: 3,
                name: "Ada".to_string(),
                title: None,
            }
        );
    }

    #[test]
    fn absent_optional_field_keeps_default() {
        let (cursor, index) = record_fixture(&["id"], vec![Value::Int(9)]);
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::with_defaults();
        let person = mapper.create_instance(&record, &ConverterSet::new()).unwrap();
        assert_eq!(person.id, 9);
        assert_eq!(person.name, "");
    }

    #[test]
    fn absent_required_field_is_missing_field_error() {
        let (cursor, index) = record_fixture(&["id"], vec![Value::Int(9)]);
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .condition("name", Condition::Required)
            .build()
            .unwrap();
        let err = mapper
            .create_instance(&record, &ConverterSet::new())
            .unwrap_err();
        match err {
            Error::Binding(b) => {
                assert_eq!(b.kind, BindingErrorKind::MissingField);
                assert_eq!(b.field.as_deref(), Some("name"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn null_in_not_null_field_is_violation() {
        let (cursor, index) = record_fixture(&["id", "name"], vec![Value::Int(1), Value::Null]);
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .condition("name", Condition::NotNull)
            .build()
            .unwrap();
        let err = mapper
            .create_instance(&record, &ConverterSet::new())
            .unwrap_err();
        match err {
            Error::Binding(b) => assert_eq!(b.kind, BindingErrorKind::NullViolation),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn absent_not_null_field_is_violation() {
        let (cursor, index) = record_fixture(&["id"], vec![Value::Int(1)]);
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .condition("name", Condition::NotNull)
            .build()
            .unwrap();
        assert!(matches!(
            mapper.create_instance(&record, &ConverterSet::new()),
            Err(Error::Binding(b)) if b.kind == BindingErrorKind::NullViolation
        ));
    }

    #[test]
    fn remap_reads_from_new_field() {
        let (cursor, index) = record_fixture(
            &["id", "nom"],
            vec![Value::Int(1), Value::Text("Grace".to_string())],
        );
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .map("name", "nom")
            .build()
            .unwrap();
        let person = mapper.create_instance(&record, &ConverterSet::new()).unwrap();
        assert_eq!(person.name, "Grace");
    }

    #[test]
    fn remap_onto_claimed_field_is_rejected() {
        let err = PropertyMapper::<Person>::builder()
            .map("title", "Name")
            .build()
            .unwrap_err();
        match err {
            Error::Config(c) => assert_eq!(c.kind, ConfigErrorKind::DuplicateField),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_property_is_rejected() {
        let err = PropertyMapper::<Person>::builder()
            .map("nickname", "nick")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(c) if c.kind == ConfigErrorKind::UnknownProperty
        ));
    }

    #[test]
    fn per_property_converter_takes_precedence() {
        let (cursor, index) = record_fixture(
            &["id", "name"],
            vec![Value::Int(1), Value::Text("grace".to_string())],
        );
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .convert_with::<String>("name", |v| {
                String::from_value(v).map(|s| s.to_uppercase())
            })
            .build()
            .unwrap();
        let person = mapper.create_instance(&record, &ConverterSet::new()).unwrap();
        assert_eq!(person.name, "GRACE");
    }

    #[test]
    fn mistyped_converter_is_config_error() {
        let (cursor, index) = record_fixture(&["id"], vec![Value::Int(1)]);
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .convert_with::<String>("id", |v| String::from_value(v))
            .build()
            .unwrap();
        let err = mapper
            .create_instance(&record, &ConverterSet::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(c) if c.kind == ConfigErrorKind::ConverterTypeMismatch
        ));
    }

    #[test]
    fn ignored_on_load_keeps_default() {
        let (cursor, index) = record_fixture(
            &["id", "name"],
            vec![Value::Int(1), Value::Text("x".to_string())],
        );
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .ignore("name", IgnoreScope::OnLoad)
            .build()
            .unwrap();
        let person = mapper.create_instance(&record, &ConverterSet::new()).unwrap();
        assert_eq!(person.name, "");
    }

    #[test]
    fn after_bind_sees_record_and_entity() {
        let (cursor, index) = record_fixture(
            &["id", "name"],
            vec![Value::Int(1), Value::Text("x".to_string())],
        );
        let record = Record::new(&cursor, &index);
        let mapper = PropertyMapper::<Person>::builder()
            .after_bind(|rec, person| {
                person.title = Some(format!("row of {} fields", rec.field_count()));
            })
            .build()
            .unwrap();
        let person = mapper.create_instance(&record, &ConverterSet::new()).unwrap();
        assert_eq!(person.title.as_deref(), Some("row of 2 fields"));
    }

    #[test]
    fn registry_converter_applies_when_no_per_property_converter() {
        let (cursor, index) = record_fixture(
            &["id", "name"],
            vec![Value::Int(5), Value::Text("x".to_string())],
        );
        let record = Record::new(&cursor, &index);
        let mut converters = ConverterSet::new();
        converters.insert::<i32>(|v| i32::from_value(v).map(|n| n + 100));
        let mapper = PropertyMapper::<Person>::with_defaults();
        let person = mapper.create_instance(&record, &converters).unwrap();
        assert_eq!(person.id, 105);
    }

    #[test]
    fn save_converter_shapes_output_value() {
        let mapper = PropertyMapper::<Person>::builder()
            .save_with::<String>("name", |s| Value::Text(s.to_lowercase()))
            .build()
            .unwrap();
        let person = Person {
            id: 1,
            name: "ADA".to_string(),
            title: None,
        };
        let binding = mapper
            .bindings()
            .iter()
            .find(|b| b.property() == "name")
            .unwrap();
        assert_eq!(
            binding.load_from(&person).unwrap(),
            Value::Text("ada".to_string())
        );
    }
}
