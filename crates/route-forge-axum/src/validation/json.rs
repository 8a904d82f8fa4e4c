use route_forge_core::schema::{ObjectSchema, Schema};
use route_forge_core::types::{
    AttributeKind, IntegerConstraints, ModelDescriptor, Relation, Verb,
};

use super::SchemaValidator;

/// Validator for plain `application/json` bodies.
#[derive(Debug, Clone, Default)]
pub struct JsonValidator;

impl JsonValidator {
    pub fn new() -> Self {
        Self
    }
}

/// Record ids are strings here but may be numeric in other stores.
pub fn id_schema() -> Schema {
    Schema::Alternatives(vec![
        Schema::string(),
        Schema::Integer(IntegerConstraints::unconstrained()),
    ])
}

fn relation_schema(relation: &Relation, embedded: bool) -> Schema {
    let single = if embedded {
        Schema::Alternatives(vec![id_schema(), Schema::any_object()])
    } else {
        id_schema()
    };
    match relation {
        Relation::Model(_) => single,
        Relation::Collection(_) if embedded => Schema::array_of(single),
        Relation::Collection(_) => Schema::Alternatives(vec![single.clone(), Schema::array_of(single)]),
    }
}

fn attributes_schema(model: &ModelDescriptor, embedded_relations: bool) -> ObjectSchema {
    let mut object = ObjectSchema::new();
    for (name, attr) in model.attributes() {
        let schema = match &attr.kind {
            AttributeKind::Scalar(ft) => Schema::for_field_type(ft),
            AttributeKind::Relation(r) => relation_schema(r, embedded_relations),
        };
        object = object.property(name.as_str(), schema, attr.required);
        if let Some(desc) = &attr.description {
            object = object.describe(name.as_str(), desc.clone());
        }
    }
    object
}

impl SchemaValidator for JsonValidator {
    fn name(&self) -> &str {
        "json"
    }

    fn content_type(&self) -> &str {
        "application/json"
    }

    fn response_schema(&self, model: &ModelDescriptor) -> Option<Schema> {
        let object = attributes_schema(model, true)
            .property("id", id_schema(), true)
            .property("createdAt", Schema::DateTime, false)
            .property("updatedAt", Schema::DateTime, false)
            .allow_unknown(true);
        Some(Schema::Object(object))
    }

    fn payload_schema(&self, model: &ModelDescriptor, verb: Verb) -> Option<Schema> {
        match verb {
            Verb::Post | Verb::Put => Some(Schema::Object(attributes_schema(model, false))),
            Verb::Patch => Some(Schema::Object(attributes_schema(model, false).all_optional())),
            Verb::Get | Verb::Delete | Verb::Upload => None,
        }
    }

    fn error_schema(&self) -> Schema {
        Schema::Object(
            ObjectSchema::new()
                .property("error", Schema::string(), true)
                .property("message", Schema::string(), true)
                .property("details", Schema::array_of(Schema::string()), false),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use route_forge_core::types::{
        AttributeDefinition, FieldType, ModelName, TextConstraints,
    };
    use serde_json::json;

    fn stuff() -> ModelDescriptor {
        ModelDescriptor::builder(ModelName::new("stuff").unwrap())
            .attribute(
                "name",
                AttributeDefinition::scalar(FieldType::String(TextConstraints::unconstrained()))
                    .required(),
            )
            .attribute(
                "age",
                AttributeDefinition::scalar(FieldType::Integer(
                    IntegerConstraints::with_range(0, 9000).unwrap(),
                )),
            )
            .attribute(
                "users",
                AttributeDefinition::relation(Relation::Collection(ModelName::new("user").unwrap())),
            )
            .attribute(
                "owner",
                AttributeDefinition::relation(Relation::Model(ModelName::new("user").unwrap())),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn post_payload_respects_required_and_rejects_unknown() {
        let schema = JsonValidator.payload_schema(&stuff(), Verb::Post).unwrap();
        assert!(schema.is_valid(&json!({"name": "test", "age": 10})));
        assert!(!schema.is_valid(&json!({"age": 10})));
        assert!(!schema.is_valid(&json!({"name": "x", "id": "forged"})));
        assert!(!schema.is_valid(&json!({"name": "x", "age": 9001})));
    }

    #[test]
    fn payload_relations_take_ids() {
        let schema = JsonValidator.payload_schema(&stuff(), Verb::Post).unwrap();
        assert!(schema.is_valid(&json!({"name": "x", "owner": "u1", "users": ["u1", 2]})));
        assert!(schema.is_valid(&json!({"name": "x", "users": "u1"})));
        assert!(!schema.is_valid(&json!({"name": "x", "owner": {"id": "u1"}})));
    }

    #[test]
    fn patch_makes_everything_optional() {
        let schema = JsonValidator.payload_schema(&stuff(), Verb::Patch).unwrap();
        assert!(schema.is_valid(&json!({})));
        assert!(schema.is_valid(&json!({"age": 3})));
        assert!(!schema.is_valid(&json!({"unknown": 3})));
    }

    #[test]
    fn body_less_verbs_have_no_payload() {
        for verb in [Verb::Get, Verb::Delete, Verb::Upload] {
            assert!(JsonValidator.payload_schema(&stuff(), verb).is_none(), "{verb}");
        }
    }

    #[test]
    fn response_keeps_managed_keys_and_embeds_relations() {
        let schema = JsonValidator.response_schema(&stuff()).unwrap();
        let record = json!({
            "id": "r1",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "name": "x",
            "owner": {"id": "u1", "name": "someone"},
            "users": ["u2", {"id": "u3"}],
            "extra": true
        });
        assert!(schema.is_valid(&record));
        assert!(!schema.is_valid(&json!({"name": "x"})));
    }

    #[test]
    fn error_schema_matches_api_errors() {
        let schema = JsonValidator.error_schema();
        assert!(schema.is_valid(&json!({"error": "x", "message": "y", "details": ["z"]})));
        assert!(!schema.is_valid(&json!({"error": "x"})));
    }
}
