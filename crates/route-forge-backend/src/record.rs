use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use route_forge_core::types::ModelName;
use serde_json::{Map, Value};

/// Keys managed by the store; never accepted from a payload.
pub const RESERVED_KEYS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// A stored row of a model collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub model: ModelName,
    /// Attribute values, reserved keys excluded.
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Creates a record with a fresh time-ordered id.
    pub fn new(model: ModelName, fields: Map<String, Value>) -> Self {
        Self::with_id(uuid::Uuid::now_v7().to_string(), model, fields)
    }

    pub fn with_id(id: impl Into<String>, model: ModelName, fields: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            model,
            fields: strip_reserved(fields),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Merges `fields` over the current values and bumps `updated_at`.
    pub fn merge(&mut self, fields: Map<String, Value>) {
        for (k, v) in strip_reserved(fields) {
            self.fields.insert(k, v);
        }
        self.updated_at = Utc::now();
    }

    /// Replaces every attribute value, keeping id and creation time.
    pub fn replace(&mut self, fields: Map<String, Value>) {
        self.fields = strip_reserved(fields);
        self.updated_at = Utc::now();
    }

    /// Wire form: the attributes plus `id`, `createdAt` and `updatedAt`.
    pub fn to_json(&self) -> Value {
        let mut out = self.fields.clone();
        out.insert("id".into(), Value::String(self.id.clone()));
        out.insert(
            "createdAt".into(),
            Value::String(self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        out.insert(
            "updatedAt".into(),
            Value::String(self.updated_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Value::Object(out)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.model, self.id)
    }
}

fn strip_reserved(mut fields: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_KEYS {
        fields.remove(key);
    }
    fields
}

/// How an update treats attributes missing from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Keep attributes the payload does not mention.
    Merge,
    /// Drop attributes the payload does not mention.
    Replace,
}

/// Equality filter plus pagination for `find`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub filter: BTreeMap<String, Value>,
    pub limit: Option<usize>,
    pub skip: usize,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filter.insert(field.into(), value);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// True when every filter entry matches. String filter values also match
    /// numbers and booleans with the same textual form, so criteria built
    /// from query strings behave as expected.
    pub fn matches(&self, record: &Record) -> bool {
        self.filter.iter().all(|(field, expected)| {
            let actual = match field.as_str() {
                "id" => Some(Value::String(record.id.clone())),
                _ => record.field(field).cloned(),
            };
            match (actual, expected) {
                (Some(actual), expected) if &actual == expected => true,
                (Some(Value::Number(n)), Value::String(s)) => n.to_string() == *s,
                (Some(Value::Bool(b)), Value::String(s)) => b.to_string() == *s,
                _ => false,
            }
        })
    }
}

/// Records returned by `find`, with the match count before pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub records: Vec<Record>,
    pub total_count: Option<usize>,
}

impl QueryResult {
    pub fn new(records: Vec<Record>, total_count: Option<usize>) -> Self {
        Self {
            records,
            total_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model() -> ModelName {
        ModelName::new("test").unwrap()
    }

    fn fields(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn new_strips_reserved_keys() {
        let record = Record::new(
            model(),
            fields(json!({"id": "forged", "createdAt": "x", "name": "a"})),
        );
        assert_ne!(record.id, "forged");
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.field("name"), Some(&json!("a")));
    }

    #[test]
    fn to_json_adds_managed_keys() {
        let record = Record::with_id("r1", model(), fields(json!({"age": 3})));
        let json = record.to_json();
        assert_eq!(json["id"], "r1");
        assert_eq!(json["age"], 3);
        assert!(json["createdAt"].as_str().unwrap().ends_with('Z'));
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn merge_keeps_and_replace_drops() {
        let mut record = Record::with_id("r1", model(), fields(json!({"a": 1, "b": 2})));
        record.merge(fields(json!({"b": 3})));
        assert_eq!(record.fields, fields(json!({"a": 1, "b": 3})));
        record.replace(fields(json!({"c": 4, "id": "nope"})));
        assert_eq!(record.fields, fields(json!({"c": 4})));
        assert_eq!(record.id, "r1");
    }

    #[test]
    fn criteria_matching_is_textual_for_query_values() {
        let record = Record::with_id("r1", model(), fields(json!({"age": 10, "ok": true})));
        assert!(Criteria::new().matches(&record));
        assert!(Criteria::new().with_filter("age", json!("10")).matches(&record));
        assert!(Criteria::new().with_filter("age", json!(10)).matches(&record));
        assert!(Criteria::new().with_filter("ok", json!("true")).matches(&record));
        assert!(Criteria::new().with_filter("id", json!("r1")).matches(&record));
        assert!(!Criteria::new().with_filter("age", json!("11")).matches(&record));
        assert!(!Criteria::new().with_filter("missing", json!("x")).matches(&record));
    }

    #[test]
    fn display_is_model_and_id() {
        let record = Record::with_id("r1", model(), Map::new());
        assert_eq!(record.to_string(), "test:r1");
    }
}
