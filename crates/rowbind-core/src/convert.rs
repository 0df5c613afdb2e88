//! Value conversion between database values and Rust types.
//!
//! Conversion is trait dispatch: each target type implements [`FromValue`]
//! with its own rule set, so every rule is independently testable. The
//! special cases the binding engine needs are all here:
//!
//! - null markers default non-nullable built-ins and become `None` for
//!   `Option` targets
//! - enums accept a defined member by case-insensitive name or by underlying
//!   numeric value; an empty string reads as null
//! - GUIDs accept 16-byte values or GUID-formatted strings; an empty string
//!   reads as null
//! - `char` reads an empty fixed-length string as null
//! - [`Json`] deserializes JSON-shaped string payloads into complex types
//!
//! [`ConverterSet`] holds caller-registered converters keyed by target type;
//! mappers consult it before falling back to the standard `FromValue` path.

use crate::error::{BindingError, BindingErrorKind, Error, Result};
use crate::value::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Trait for converting a database [`Value`] into a typed value.
pub trait FromValue: Sized {
    /// Convert from a value, returning a binding error if the conversion fails.
    ///
    /// A null marker converts to the type's default for built-in value types.
    fn from_value(value: &Value) -> Result<Self>;

    /// Convert from a value into an optional, mapping "reads as null" cases
    /// to `None`.
    ///
    /// The default treats only the explicit null marker as null; types with
    /// empty-string-as-null quirks (enums, GUIDs, `char`, JSON payloads)
    /// override this.
    fn from_value_opt(value: &Value) -> Result<Option<Self>> {
        if value.is_null() {
            Ok(None)
        } else {
            Self::from_value(value).map(Some)
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        T::from_value_opt(value)
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(false);
        }
        if let Some(v) = value.as_bool() {
            return Ok(v);
        }
        if let Some(s) = value.as_str() {
            return match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(BindingError::conversion(value, "bool").into()),
            };
        }
        Err(BindingError::conversion(value, "bool").into())
    }
}

macro_rules! int_from_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self> {
                    if value.is_null() {
                        return Ok(0);
                    }
                    if let Some(s) = value.as_str() {
                        return s
                            .trim()
                            .parse::<$ty>()
                            .map_err(|_| BindingError::conversion(value, stringify!($ty)).into());
                    }
                    let wide = value
                        .as_i64()
                        .ok_or_else(|| BindingError::conversion(value, stringify!($ty)))?;
                    <$ty>::try_from(wide)
                        .map_err(|_| BindingError::conversion(value, stringify!($ty)).into())
                }
            }
        )+
    };
}

int_from_value!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(0.0);
        }
        if let Value::Float(v) = value {
            return Ok(*v);
        }
        if let Some(s) = value.as_str() {
            return s
                .trim()
                .parse::<f32>()
                .map_err(|_| BindingError::conversion(value, "f32").into());
        }
        #[allow(clippy::cast_possible_truncation)]
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| BindingError::conversion(value, "f32").into())
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(0.0);
        }
        if let Some(s) = value.as_str() {
            return s
                .trim()
                .parse::<f64>()
                .map_err(|_| BindingError::conversion(value, "f64").into());
        }
        value
            .as_f64()
            .ok_or_else(|| BindingError::conversion(value, "f64").into())
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(String::new()),
            Value::Text(s) | Value::Decimal(s) => Ok(s.clone()),
            Value::Bool(v) => Ok(v.to_string()),
            Value::TinyInt(v) => Ok(v.to_string()),
            Value::SmallInt(v) => Ok(v.to_string()),
            Value::Int(v) => Ok(v.to_string()),
            Value::BigInt(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(v.to_string()),
            Value::Double(v) => Ok(v.to_string()),
            Value::Date(v) => Ok(v.to_string()),
            Value::Time(v) | Value::Timestamp(v) => Ok(v.to_string()),
            Value::Uuid(bytes) => Ok(format_uuid(bytes)),
            Value::Json(j) => Ok(j.to_string()),
            Value::Bytes(_) => Err(BindingError::conversion(value, "String").into()),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Vec::new());
        }
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| BindingError::conversion(value, "Vec<u8>").into())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Json(v) => Ok(v.clone()),
            Value::Text(s) => serde_json::from_str(s)
                .map_err(|_| BindingError::conversion(value, "serde_json::Value").into()),
            _ => Err(BindingError::conversion(value, "serde_json::Value").into()),
        }
    }
}

/// `char` conversion: databases store empty fixed-length character values
/// that cannot be coerced to a single character, so an empty string reads as
/// null (and defaults to the zero char for a non-nullable target).
impl FromValue for char {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok('\0'),
            Value::Text(s) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (None, _) => Ok('\0'),
                    (Some(c), None) => Ok(c),
                    _ => Err(BindingError::conversion(value, "char").into()),
                }
            }
            _ => Err(BindingError::conversion(value, "char").into()),
        }
    }

    fn from_value_opt(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Text(s) if s.is_empty() => Ok(None),
            other => Self::from_value(other).map(Some),
        }
    }
}

static UUID_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
    )
    .expect("uuid pattern")
});

/// Format 16 GUID bytes as the canonical hyphenated string.
pub fn format_uuid(bytes: &[u8; 16]) -> String {
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Parse a canonical or bare-hex GUID string into 16 bytes.
pub fn parse_uuid(s: &str) -> Option<[u8; 16]> {
    let s = s.trim();
    let bare: String;
    let hex = if UUID_PATTERN.is_match(s) {
        bare = s.replace('-', "");
        &bare
    } else if s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit()) {
        s
    } else {
        return None;
    };
    let mut out = [0u8; 16];
    for (i, chunk) in out.iter_mut().enumerate() {
        *chunk = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(out)
}

/// GUID conversion: 16-byte passthrough, GUID-string parsing, empty string
/// reads as null. A malformed string is a binding error rather than a
/// generic conversion failure.
impl FromValue for [u8; 16] {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok([0u8; 16]),
            Value::Uuid(v) => Ok(*v),
            Value::Bytes(v) if v.len() == 16 => {
                let mut arr = [0u8; 16];
                arr.copy_from_slice(v);
                Ok(arr)
            }
            Value::Text(s) => {
                if s.trim().is_empty() {
                    return Ok([0u8; 16]);
                }
                parse_uuid(s).ok_or_else(|| {
                    Error::Binding(BindingError {
                        kind: BindingErrorKind::MalformedUuid,
                        field: None,
                        value: value.describe(),
                        target: "[u8; 16]",
                    })
                })
            }
            _ => Err(BindingError::conversion(value, "[u8; 16]").into()),
        }
    }

    fn from_value_opt(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Text(s) if s.trim().is_empty() => Ok(None),
            other => Self::from_value(other).map(Some),
        }
    }
}

/// Contract for enums stored as a member name or an underlying numeric value.
///
/// Usually implemented through the [`db_enum!`](crate::db_enum) macro rather
/// than by hand.
pub trait DbEnum: Sized + Copy + Send + Sync + 'static {
    /// Look up a member by name, case-insensitively.
    fn from_name(name: &str) -> Option<Self>;

    /// Look up a member by underlying numeric value.
    fn from_discriminant(v: i64) -> Option<Self>;

    /// The member's name.
    fn name(&self) -> &'static str;

    /// The member's underlying numeric value.
    fn discriminant(&self) -> i64;
}

/// Standard enum conversion for a non-nullable target.
///
/// Null and empty-string inputs read as null, which a non-nullable enum slot
/// cannot hold; use `Option<E>` for nullable enum columns.
pub fn enum_from_value<E: DbEnum>(value: &Value) -> Result<E> {
    let target = std::any::type_name::<E>();
    if value.is_null() {
        return Err(Error::Binding(BindingError {
            kind: BindingErrorKind::NullViolation,
            field: None,
            value: value.describe(),
            target,
        }));
    }
    if let Some(s) = value.as_str() {
        if s.is_empty() {
            return Err(Error::Binding(BindingError {
                kind: BindingErrorKind::NullViolation,
                field: None,
                value: value.describe(),
                target,
            }));
        }
        if let Some(member) = E::from_name(s) {
            return Ok(member);
        }
        // A numeric stored as text still counts as an underlying value.
        if let Ok(n) = s.trim().parse::<i64>() {
            if let Some(member) = E::from_discriminant(n) {
                return Ok(member);
            }
        }
    } else if let Some(n) = value.as_i64() {
        if let Some(member) = E::from_discriminant(n) {
            return Ok(member);
        }
    }
    Err(Error::Binding(BindingError {
        kind: BindingErrorKind::UndefinedEnumValue,
        field: None,
        value: value.describe(),
        target,
    }))
}

/// Standard enum conversion for an optional target: null and empty string
/// yield `None`.
pub fn enum_from_value_opt<E: DbEnum>(value: &Value) -> Result<Option<E>> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) if s.is_empty() => Ok(None),
        other => enum_from_value(other).map(Some),
    }
}

/// Define an enum bound to database values.
///
/// Generates the enum plus [`DbEnum`], [`FromValue`], and `Into<Value>`
/// implementations. Members convert from a defined name (case-insensitive)
/// or the underlying numeric value, and store back as the member name.
///
/// ```
/// rowbind_core::db_enum! {
///     pub enum Status {
///         Active = 1,
///         Retired = 2,
///     }
/// }
/// ```
#[macro_export]
macro_rules! db_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $disc:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(i64)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $disc),+
        }

        impl $crate::convert::DbEnum for $name {
            fn from_name(name: &str) -> Option<Self> {
                $(
                    if name.eq_ignore_ascii_case(stringify!($variant)) {
                        return Some(Self::$variant);
                    }
                )+
                None
            }

            fn from_discriminant(v: i64) -> Option<Self> {
                match v {
                    $($disc => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant)),+
                }
            }

            fn discriminant(&self) -> i64 {
                *self as i64
            }
        }

        impl $crate::convert::FromValue for $name {
            fn from_value(value: &$crate::value::Value) -> $crate::error::Result<Self> {
                $crate::convert::enum_from_value::<Self>(value)
            }

            fn from_value_opt(
                value: &$crate::value::Value,
            ) -> $crate::error::Result<Option<Self>> {
                $crate::convert::enum_from_value_opt::<Self>(value)
            }
        }

        impl From<$name> for $crate::value::Value {
            fn from(v: $name) -> Self {
                $crate::value::Value::Text(
                    <$name as $crate::convert::DbEnum>::name(&v).to_string(),
                )
            }
        }
    };
}

/// Wrapper marking a field as a JSON-shaped payload.
///
/// Reads either a native [`Value::Json`] or a `Text` value whose trimmed
/// content is `{..}` or `[..]` delimited. Empty or whitespace-only text
/// reads as null.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Json<T>(pub T);

fn json_shaped(s: &str) -> bool {
    let t = s.trim();
    t.is_empty()
        || (t.starts_with('{') && t.ends_with('}'))
        || (t.starts_with('[') && t.ends_with(']'))
}

impl<T: serde::de::DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(j) => serde_json::from_value(j.clone())
                .map(Json)
                .map_err(|_| BindingError::conversion(value, std::any::type_name::<T>()).into()),
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    // Null payload cannot produce a non-optional T.
                    return Err(BindingError::conversion(value, std::any::type_name::<T>()).into());
                }
                if !json_shaped(trimmed) {
                    return Err(
                        BindingError::conversion(value, std::any::type_name::<T>()).into()
                    );
                }
                serde_json::from_str(trimmed)
                    .map(Json)
                    .map_err(|_| BindingError::conversion(value, std::any::type_name::<T>()).into())
            }
            _ => Err(BindingError::conversion(value, std::any::type_name::<T>()).into()),
        }
    }

    fn from_value_opt(value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Text(s) if s.trim().is_empty() => Ok(None),
            other => Self::from_value(other).map(Some),
        }
    }
}

impl<T: serde::Serialize> From<Json<T>> for Value {
    fn from(v: Json<T>) -> Self {
        match serde_json::to_value(v.0) {
            Ok(j) => Value::Json(j),
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize Json field; storing NULL");
                Value::Null
            }
        }
    }
}

/// A custom converter for a target type.
pub type ConvertFn<T> = Arc<dyn Fn(&Value) -> Result<T> + Send + Sync>;

/// Table of caller-registered value converters keyed by target type.
///
/// Cloning is cheap (the converters themselves are shared), so the registry
/// hands out copy-on-write snapshots to readers.
#[derive(Clone, Default)]
pub struct ConverterSet {
    table: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ConverterSet {
    /// Create an empty converter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter for `T`. Returns `true` if a converter for `T`
    /// was already present (and has been replaced).
    pub fn insert<T: 'static>(
        &mut self,
        f: impl Fn(&Value) -> Result<T> + Send + Sync + 'static,
    ) -> bool {
        let erased: Arc<dyn Any + Send + Sync> = Arc::new(Arc::new(f) as ConvertFn<T>);
        self.table.insert(TypeId::of::<T>(), erased).is_some()
    }

    /// Check whether a converter for `T` is registered.
    pub fn contains<T: 'static>(&self) -> bool {
        self.table.contains_key(&TypeId::of::<T>())
    }

    /// Fetch the converter for `T`, if any.
    pub fn get<T: 'static>(&self) -> Option<ConvertFn<T>> {
        self.table
            .get(&TypeId::of::<T>())
            .and_then(|erased| erased.downcast_ref::<ConvertFn<T>>())
            .cloned()
    }

    /// Convert through the registered converter for `T`, falling back to the
    /// standard [`FromValue`] path.
    pub fn convert<T: FromValue + 'static>(&self, value: &Value) -> Result<T> {
        match self.get::<T>() {
            Some(f) => f(value),
            None => T::from_value(value),
        }
    }

    /// Number of registered converters.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Check if no converters are registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Debug for ConverterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterSet")
            .field("len", &self.table.len())
            .finish()
    }
}
