use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Optional bounds for `FieldType::Integer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntegerConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl IntegerConstraints {
    pub fn unconstrained() -> Self {
        Self {
            min: None,
            max: None,
        }
    }

    /// Creates integer with range bounds, validating min <= max.
    pub fn with_range(min: i64, max: i64) -> Result<Self, SchemaError> {
        if min > max {
            return Err(SchemaError::InvalidIntegerRange { min, max });
        }
        Ok(Self {
            min: Some(min),
            max: Some(max),
        })
    }

    pub fn with_min(min: i64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn validate(&self) -> Result<(), SchemaError> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(SchemaError::InvalidIntegerRange { min, max });
            }
        }
        Ok(())
    }

    /// Returns true if `value` lies within the bounds.
    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_range() {
        let c = IntegerConstraints::with_range(0, 9000).unwrap();
        assert_eq!(c.min, Some(0));
        assert_eq!(c.max, Some(9000));
    }

    #[test]
    fn invalid_range() {
        assert!(IntegerConstraints::with_range(10, 5).is_err());
    }

    #[test]
    fn contains_respects_open_bounds() {
        assert!(IntegerConstraints::unconstrained().contains(i64::MIN));
        assert!(IntegerConstraints::with_min(0).contains(10));
        assert!(!IntegerConstraints::with_min(0).contains(-1));
        let c = IntegerConstraints::with_range(0, 9000).unwrap();
        assert!(c.contains(9000));
        assert!(!c.contains(9001));
    }

    #[test]
    fn serde_skips_none() {
        let json = serde_json::to_string(&IntegerConstraints::unconstrained()).unwrap();
        assert_eq!(json, "{}");
    }
}
