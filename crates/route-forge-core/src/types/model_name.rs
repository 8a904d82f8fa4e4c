use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// A validated, URL-safe model name matching `[A-Za-z][A-Za-z0-9_-]*`.
///
/// The name is used verbatim as the collection segment of generated paths.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelName(String);

impl ModelName {
    /// Creates a new `ModelName`, validating the path-segment format.
    pub fn new(s: impl Into<String>) -> Result<Self, SchemaError> {
        let s = s.into();
        if !is_path_segment(&s) {
            return Err(SchemaError::InvalidModelName(s));
        }
        Ok(Self(s))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_path_segment(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<ModelName> for String {
    fn from(n: ModelName) -> String {
        n.0
    }
}

impl TryFrom<String> for ModelName {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<str> for ModelName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["test", "multicolour_user", "Stuff", "blog-post", "a1"] {
            assert!(ModelName::new(name).is_ok(), "expected valid: {name}");
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", "1test", "_test", "my test", "a/b", "café"] {
            assert!(ModelName::new(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn serde_roundtrip() {
        let name = ModelName::new("test").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"test\"");
        let back: ModelName = serde_json::from_str(&json).unwrap();
        assert_eq!(name, back);
    }

    #[test]
    fn serde_rejects_invalid() {
        assert!(serde_json::from_str::<ModelName>("\"not valid\"").is_err());
    }
}
