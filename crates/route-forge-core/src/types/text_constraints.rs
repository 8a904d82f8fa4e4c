use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Optional length bounds for `FieldType::String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TextConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl TextConstraints {
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn with_max_length(max: u32) -> Self {
        Self {
            min_length: None,
            max_length: Some(max),
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(SchemaError::InvalidLengthRange { min, max });
            }
        }
        Ok(())
    }
}
