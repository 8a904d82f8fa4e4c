use std::fmt;

use super::integer_constraints::IntegerConstraints;
use super::text_constraints::TextConstraints;

/// Scalar attribute types understood by the route generator.
///
/// Keywords follow the usual ORM vocabulary; `text` and `email` are accepted
/// as aliases of `string`, `number` as an alias of `float`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldType {
    String(TextConstraints),
    Integer(IntegerConstraints),
    Float,
    Boolean,
    Date,
    DateTime,
    Enum(Vec<String>),
    Array,
    Json,
}

impl FieldType {
    /// The canonical keyword written back when serializing.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::String(_) | Self::Enum(_) => "string",
            Self::Integer(_) => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Array => "array",
            Self::Json => "json",
        }
    }

    /// Resolves a keyword without constraints. `None` for unknown keywords.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let ft = match keyword.to_ascii_lowercase().as_str() {
            "string" | "text" | "email" => Self::String(TextConstraints::unconstrained()),
            "integer" | "int" => Self::Integer(IntegerConstraints::unconstrained()),
            "float" | "number" => Self::Float,
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::Date,
            "datetime" => Self::DateTime,
            "array" => Self::Array,
            "json" => Self::Json,
            _ => return None,
        };
        Some(ft)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enum(variants) => write!(f, "enum({})", variants.join("|")),
            other => write!(f, "{}", other.keyword()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_canonical_types() {
        assert_eq!(
            FieldType::from_keyword("TEXT"),
            Some(FieldType::String(TextConstraints::unconstrained()))
        );
        assert_eq!(FieldType::from_keyword("number"), Some(FieldType::Float));
        assert_eq!(FieldType::from_keyword("bigint"), None);
    }

    #[test]
    fn display_enum_lists_variants() {
        let ft = FieldType::Enum(vec!["draft".into(), "live".into()]);
        assert_eq!(ft.to_string(), "enum(draft|live)");
        assert_eq!(FieldType::Boolean.to_string(), "boolean");
    }
}
