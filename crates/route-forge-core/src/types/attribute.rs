use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

use super::field_type::FieldType;
use super::integer_constraints::IntegerConstraints;
use super::model_name::ModelName;
use super::relation::Relation;
use super::text_constraints::TextConstraints;

/// What an attribute holds: a typed scalar or a relation to another model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeKind {
    Scalar(FieldType),
    Relation(Relation),
}

/// A single attribute of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub kind: AttributeKind,
    pub required: bool,
    pub description: Option<String>,
}

impl AttributeDefinition {
    pub fn scalar(field_type: FieldType) -> Self {
        Self {
            kind: AttributeKind::Scalar(field_type),
            required: false,
            description: None,
        }
    }

    pub fn relation(relation: Relation) -> Self {
        Self {
            kind: AttributeKind::Relation(relation),
            required: false,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn relation_target(&self) -> Option<&Relation> {
        match &self.kind {
            AttributeKind::Relation(r) => Some(r),
            AttributeKind::Scalar(_) => None,
        }
    }

    /// Builds a definition from its flat wire form. `field` is used for error context.
    pub(crate) fn from_raw(field: &str, raw: RawAttribute) -> Result<Self, SchemaError> {
        let kind = match (raw.model, raw.collection) {
            (Some(_), Some(_)) => return Err(SchemaError::AmbiguousRelation(field.to_string())),
            (Some(target), None) => AttributeKind::Relation(Relation::Model(target)),
            (None, Some(target)) => AttributeKind::Relation(Relation::Collection(target)),
            (None, None) => {
                let keyword = match (raw.kind.as_deref(), raw.variants.is_some()) {
                    (Some(k), _) => k,
                    (None, true) => "string",
                    (None, false) => return Err(SchemaError::MissingFieldType(field.to_string())),
                };
                let resolved =
                    FieldType::from_keyword(keyword).ok_or_else(|| SchemaError::UnknownFieldType {
                        field: field.to_string(),
                        kind: keyword.to_string(),
                    })?;
                let field_type = match resolved {
                    FieldType::String(_) => match raw.variants {
                        Some(variants) if variants.is_empty() => {
                            return Err(SchemaError::EmptyEnumVariants(field.to_string()))
                        }
                        Some(variants) => FieldType::Enum(variants),
                        None => {
                            let text = TextConstraints {
                                min_length: raw.min_length,
                                max_length: raw.max_length,
                            };
                            text.validate()?;
                            FieldType::String(text)
                        }
                    },
                    FieldType::Integer(_) => {
                        let range = IntegerConstraints {
                            min: raw.min,
                            max: raw.max,
                        };
                        range.validate()?;
                        FieldType::Integer(range)
                    }
                    other => other,
                };
                AttributeKind::Scalar(field_type)
            }
        };
        Ok(Self {
            kind,
            required: raw.required,
            description: raw.description,
        })
    }

    pub(crate) fn to_raw(&self) -> RawAttribute {
        let mut raw = RawAttribute {
            required: self.required,
            description: self.description.clone(),
            ..RawAttribute::default()
        };
        match &self.kind {
            AttributeKind::Relation(Relation::Model(t)) => raw.model = Some(t.clone()),
            AttributeKind::Relation(Relation::Collection(t)) => raw.collection = Some(t.clone()),
            AttributeKind::Scalar(ft) => {
                raw.kind = Some(ft.keyword().to_string());
                match ft {
                    FieldType::String(text) => {
                        raw.min_length = text.min_length;
                        raw.max_length = text.max_length;
                    }
                    FieldType::Integer(range) => {
                        raw.min = range.min;
                        raw.max = range.max;
                    }
                    FieldType::Enum(variants) => raw.variants = Some(variants.clone()),
                    _ => {}
                }
            }
        }
        raw
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Flat attribute form as written in configuration files:
/// `{ type = "integer", min = 0, max = 9000, required = true }` or
/// `{ collection = "users" }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawAttribute {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<ModelName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(json: serde_json::Value) -> RawAttribute {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn integer_with_range() {
        let attr = AttributeDefinition::from_raw(
            "age",
            raw(serde_json::json!({"type": "integer", "min": 0, "max": 9000})),
        )
        .unwrap();
        assert_eq!(
            attr.kind,
            AttributeKind::Scalar(FieldType::Integer(IntegerConstraints::with_range(0, 9000).unwrap()))
        );
        assert!(!attr.required);
    }

    #[test]
    fn enum_implies_string() {
        let attr = AttributeDefinition::from_raw(
            "status",
            raw(serde_json::json!({"enum": ["draft", "live"], "required": true})),
        )
        .unwrap();
        assert_eq!(
            attr.kind,
            AttributeKind::Scalar(FieldType::Enum(vec!["draft".into(), "live".into()]))
        );
        assert!(attr.required);
    }

    #[test]
    fn collection_relation() {
        let attr =
            AttributeDefinition::from_raw("users", raw(serde_json::json!({"collection": "user"})))
                .unwrap();
        let rel = attr.relation_target().unwrap();
        assert!(rel.is_collection());
        assert_eq!(rel.target().as_str(), "user");
    }

    #[test]
    fn rejects_bad_definitions() {
        let err = AttributeDefinition::from_raw(
            "owner",
            raw(serde_json::json!({"model": "user", "collection": "user"})),
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::AmbiguousRelation("owner".into()));

        let err = AttributeDefinition::from_raw("x", raw(serde_json::json!({}))).unwrap_err();
        assert_eq!(err, SchemaError::MissingFieldType("x".into()));

        let err = AttributeDefinition::from_raw("x", raw(serde_json::json!({"type": "blob"})))
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownFieldType { .. }));

        let err = AttributeDefinition::from_raw(
            "x",
            raw(serde_json::json!({"type": "integer", "min": 5, "max": 1})),
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::InvalidIntegerRange { min: 5, max: 1 });

        let err = AttributeDefinition::from_raw("s", raw(serde_json::json!({"enum": []})))
            .unwrap_err();
        assert_eq!(err, SchemaError::EmptyEnumVariants("s".into()));
    }

    #[test]
    fn raw_form_survives_conversion() {
        let original = raw(serde_json::json!({"type": "string", "max_length": 40, "required": true}));
        let attr = AttributeDefinition::from_raw("name", original).unwrap();
        let back = AttributeDefinition::from_raw("name", attr.to_raw()).unwrap();
        assert_eq!(attr, back);
    }
}
