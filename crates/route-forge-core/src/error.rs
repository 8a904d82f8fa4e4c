use std::fmt;

/// Errors raised while constructing model descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// Model name is not URL-safe.
    InvalidModelName(String),
    /// Attribute name failed identifier validation.
    InvalidFieldName(String),
    /// Attribute declared twice on one model.
    DuplicateFieldName(String),
    /// Unknown attribute type keyword.
    UnknownFieldType { field: String, kind: String },
    /// Attribute declares neither a type nor a relation.
    MissingFieldType(String),
    /// Attribute declares both `model` and `collection`.
    AmbiguousRelation(String),
    /// Integer constraint min > max.
    InvalidIntegerRange { min: i64, max: i64 },
    /// Text length constraint min > max.
    InvalidLengthRange { min: u32, max: u32 },
    /// Enum attribute with no variants.
    EmptyEnumVariants(String),
    /// Unknown verb keyword.
    UnknownVerb(String),
    /// Upload field name is empty.
    EmptyUploadField,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidModelName(s) => {
                write!(
                    f,
                    "invalid model name '{s}': must match [A-Za-z][A-Za-z0-9_-]*"
                )
            }
            Self::InvalidFieldName(s) => {
                write!(
                    f,
                    "invalid field name '{s}': must match [A-Za-z_][A-Za-z0-9_]*"
                )
            }
            Self::DuplicateFieldName(s) => write!(f, "duplicate field name '{s}'"),
            Self::UnknownFieldType { field, kind } => {
                write!(f, "unknown type '{kind}' for field '{field}'")
            }
            Self::MissingFieldType(field) => {
                write!(
                    f,
                    "field '{field}' declares neither a type nor a relation"
                )
            }
            Self::AmbiguousRelation(field) => {
                write!(
                    f,
                    "field '{field}' declares both 'model' and 'collection'"
                )
            }
            Self::InvalidIntegerRange { min, max } => {
                write!(f, "invalid integer range: min ({min}) > max ({max})")
            }
            Self::InvalidLengthRange { min, max } => {
                write!(f, "invalid length range: min ({min}) > max ({max})")
            }
            Self::EmptyEnumVariants(field) => {
                write!(f, "enum field '{field}' must have at least one variant")
            }
            Self::UnknownVerb(v) => write!(f, "unknown verb '{v}'"),
            Self::EmptyUploadField => write!(f, "upload field name must not be empty"),
        }
    }
}

impl std::error::Error for SchemaError {}
