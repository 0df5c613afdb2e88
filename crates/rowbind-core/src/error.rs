//! Error types for rowbind operations.

use std::fmt;

/// The primary error type for all rowbind operations.
#[derive(Debug)]
pub enum Error {
    /// Row-level binding failures (missing required field, null violation,
    /// undefined enum value, malformed GUID, conversion failure)
    Binding(BindingError),
    /// Setup-level mapping configuration errors
    Config(ConfigError),
    /// Invalid arguments (tuple arity shortfall, unknown adapter fields)
    Argument(ArgumentError),
    /// Faults reported by the external row cursor
    Cursor(CursorError),
    /// I/O errors
    Io(std::io::Error),
}

/// A row-level binding failure.
///
/// Carries the offending field name (when known), a description of the raw
/// value, and the target Rust type, so a failed row can be diagnosed without
/// re-running the query.
#[derive(Debug)]
pub struct BindingError {
    pub kind: BindingErrorKind,
    /// Field name, filled in by the mapper once the failing binding is known
    pub field: Option<String>,
    /// Description of the offending raw value
    pub value: String,
    /// The Rust type the value was being converted into
    pub target: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// A `Required` field is absent from the record
    MissingField,
    /// A `NotNull` field held a null value
    NullViolation,
    /// Value does not name or number a defined enum member
    UndefinedEnumValue,
    /// String could not be parsed as a GUID
    MalformedUuid,
    /// Generic conversion failure
    Conversion,
}

#[derive(Debug)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// Two properties mapped to the same field name
    DuplicateField,
    /// A mapper is already registered for the entity type
    DuplicateMapper,
    /// A value converter is already registered for the target type
    DuplicateConverter,
    /// A builder call referenced a property with no binding
    UnknownProperty,
    /// The operation requires a property mapper but another variant is registered
    NotPropertyMapper,
    /// A per-property converter was registered with the wrong value type
    ConverterTypeMismatch,
}

#[derive(Debug)]
pub struct ArgumentError {
    pub message: String,
}

#[derive(Debug)]
pub struct CursorError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BindingError {
    /// Build a generic conversion error for a value/target pair.
    pub fn conversion(value: &crate::value::Value, target: &'static str) -> Self {
        Self {
            kind: BindingErrorKind::Conversion,
            field: None,
            value: value.describe(),
            target,
        }
    }

    /// Attach the field name if it is not already known.
    #[must_use]
    pub fn with_field(mut self, field: &str) -> Self {
        if self.field.is_none() {
            self.field = Some(field.to_string());
        }
        self
    }
}

impl Error {
    /// Attach a field name to a binding error; other kinds pass through.
    #[must_use]
    pub fn with_field(self, field: &str) -> Self {
        match self {
            Error::Binding(e) => Error::Binding(e.with_field(field)),
            other => other,
        }
    }

    /// Shorthand for an argument error with a formatted message.
    pub fn argument(message: impl Into<String>) -> Self {
        Error::Argument(ArgumentError {
            message: message.into(),
        })
    }

    /// Shorthand for a configuration error.
    pub fn config(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            kind,
            message: message.into(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Binding(e) => write!(f, "Binding error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Argument(e) => write!(f, "Argument error: {}", e.message),
            Error::Cursor(e) => write!(f, "Cursor error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            BindingErrorKind::MissingField => "required field is absent",
            BindingErrorKind::NullViolation => "null value where a non-null value is required",
            BindingErrorKind::UndefinedEnumValue => "value is not a defined enum member",
            BindingErrorKind::MalformedUuid => "value is not a valid GUID",
            BindingErrorKind::Conversion => "value cannot be converted",
        };
        if let Some(field) = &self.field {
            write!(
                f,
                "{} (field '{}', value {}, target {})",
                what, field, self.value, self.target
            )
        } else {
            write!(f, "{} (value {}, target {})", what, self.value, self.target)
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Cursor(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<BindingError> for Error {
    fn from(err: BindingError) -> Self {
        Error::Binding(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ArgumentError> for Error {
    fn from(err: ArgumentError) -> Self {
        Error::Argument(err)
    }
}

impl From<CursorError> for Error {
    fn from(err: CursorError) -> Self {
        Error::Cursor(err)
    }
}

/// Result type alias for rowbind operations.
pub type Result<T> = std::result::Result<T, Error>;
