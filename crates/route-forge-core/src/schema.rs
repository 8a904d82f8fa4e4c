//! Typed validation schemas.
//!
//! A [`Schema`] is a small tree that can check a `serde_json::Value` and
//! render itself as JSON Schema for route documentation. Alternatives are
//! ordered; a value is accepted when any branch accepts it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde_json::{json, Map, Value};

use crate::types::{FieldType, IntegerConstraints, TextConstraints};

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Any,
    String {
        constraints: TextConstraints,
        valid: Vec<String>,
    },
    Integer(IntegerConstraints),
    Number,
    Boolean,
    Date,
    DateTime,
    Object(ObjectSchema),
    Array(Box<Schema>),
    Alternatives(Vec<Schema>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub properties: BTreeMap<String, Property>,
    pub allow_unknown: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub schema: Schema,
    pub required: bool,
    pub description: Option<String>,
}

/// A single failed check. `path` is a dotted JSON path, empty for the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "value {}", self.message)
        } else {
            write!(f, "\"{}\" {}", self.path, self.message)
        }
    }
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// An object schema that accepts any keys.
    pub fn open() -> Self {
        Self {
            properties: BTreeMap::new(),
            allow_unknown: true,
        }
    }

    pub fn property(mut self, name: impl Into<String>, schema: Schema, required: bool) -> Self {
        self.properties.insert(
            name.into(),
            Property {
                schema,
                required,
                description: None,
            },
        );
        self
    }

    pub fn describe(mut self, name: &str, description: impl Into<String>) -> Self {
        if let Some(p) = self.properties.get_mut(name) {
            p.description = Some(description.into());
        }
        self
    }

    pub fn allow_unknown(mut self, allow: bool) -> Self {
        self.allow_unknown = allow;
        self
    }

    /// Every property made optional.
    pub fn all_optional(mut self) -> Self {
        for p in self.properties.values_mut() {
            p.required = false;
        }
        self
    }
}

impl Schema {
    pub fn string() -> Self {
        Self::String {
            constraints: TextConstraints::unconstrained(),
            valid: Vec::new(),
        }
    }

    pub fn any_object() -> Self {
        Self::Object(ObjectSchema::open())
    }

    /// Collapses a single branch to itself; zero branches become `None`.
    pub fn one_of(mut branches: Vec<Schema>) -> Option<Self> {
        match branches.len() {
            0 => None,
            1 => branches.pop(),
            _ => Some(Self::Alternatives(branches)),
        }
    }

    pub fn array_of(item: Schema) -> Self {
        Self::Array(Box::new(item))
    }

    /// Scalar schema for an attribute type.
    pub fn for_field_type(field_type: &FieldType) -> Self {
        match field_type {
            FieldType::String(c) => Self::String {
                constraints: *c,
                valid: Vec::new(),
            },
            FieldType::Enum(variants) => Self::String {
                constraints: TextConstraints::unconstrained(),
                valid: variants.clone(),
            },
            FieldType::Integer(c) => Self::Integer(*c),
            FieldType::Float => Self::Number,
            FieldType::Boolean => Self::Boolean,
            FieldType::Date => Self::Date,
            FieldType::DateTime => Self::DateTime,
            FieldType::Array => Self::array_of(Self::Any),
            FieldType::Json => Self::Any,
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut out = Vec::new();
        self.check(value, "", &mut out);
        if out.is_empty() {
            Ok(())
        } else {
            Err(out)
        }
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.validate(value).is_ok()
    }

    fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        let mut fail = |message: String| {
            out.push(Violation {
                path: path.to_string(),
                message,
            })
        };
        match self {
            Self::Any => {}
            Self::String { constraints, valid } => {
                let Some(s) = value.as_str() else {
                    return fail("must be a string".into());
                };
                let len = s.chars().count() as u64;
                if let Some(min) = constraints.min_length {
                    if len < u64::from(min) {
                        fail(format!("length must be at least {min} characters"));
                    }
                }
                if let Some(max) = constraints.max_length {
                    if len > u64::from(max) {
                        fail(format!("length must be at most {max} characters"));
                    }
                }
                if !valid.is_empty() && !valid.iter().any(|v| v == s) {
                    fail(format!("must be one of [{}]", valid.join(", ")));
                }
            }
            Self::Integer(range) => match value.as_i64() {
                None => fail("must be an integer".into()),
                Some(n) if !range.contains(n) => fail(match (range.min, range.max) {
                    (Some(min), Some(max)) => format!("must be between {min} and {max}"),
                    (Some(min), None) => format!("must be at least {min}"),
                    (None, Some(max)) => format!("must be at most {max}"),
                    (None, None) => "must be an integer".into(),
                }),
                Some(_) => {}
            },
            Self::Number => {
                if !value.is_number() {
                    fail("must be a number".into());
                }
            }
            Self::Boolean => {
                if !value.is_boolean() {
                    fail("must be a boolean".into());
                }
            }
            Self::Date => {
                let ok = value.as_str().is_some_and(|s| {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                        || DateTime::parse_from_rfc3339(s).is_ok()
                });
                if !ok {
                    fail("must be a date (YYYY-MM-DD)".into());
                }
            }
            Self::DateTime => {
                let ok = value
                    .as_str()
                    .is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok());
                if !ok {
                    fail("must be an RFC 3339 date-time".into());
                }
            }
            Self::Array(item) => {
                let Some(items) = value.as_array() else {
                    return fail("must be an array".into());
                };
                for (i, v) in items.iter().enumerate() {
                    item.check(v, &join_path(path, &i.to_string()), out);
                }
            }
            Self::Object(obj) => {
                let Some(map) = value.as_object() else {
                    return fail("must be an object".into());
                };
                for (name, prop) in &obj.properties {
                    let child = join_path(path, name);
                    match map.get(name) {
                        None if prop.required => out.push(Violation {
                            path: child,
                            message: "is required".into(),
                        }),
                        None => {}
                        Some(Value::Null) if !prop.required => {}
                        Some(v) => prop.schema.check(v, &child, out),
                    }
                }
                if !obj.allow_unknown {
                    for key in map.keys().filter(|k| !obj.properties.contains_key(*k)) {
                        out.push(Violation {
                            path: join_path(path, key),
                            message: "is not allowed".into(),
                        });
                    }
                }
            }
            Self::Alternatives(branches) => {
                let mut closest: Option<Vec<Violation>> = None;
                for branch in branches {
                    let mut attempt = Vec::new();
                    branch.check(value, path, &mut attempt);
                    if attempt.is_empty() {
                        return;
                    }
                    if closest.as_ref().map_or(true, |c| attempt.len() < c.len()) {
                        closest = Some(attempt);
                    }
                }
                match closest {
                    Some(violations) if branches.len() == 1 => out.extend(violations),
                    Some(violations) => {
                        out.push(Violation {
                            path: path.to_string(),
                            message: format!(
                                "does not match any of {} allowed alternatives",
                                branches.len()
                            ),
                        });
                        out.extend(violations);
                    }
                    None => out.push(Violation {
                        path: path.to_string(),
                        message: "does not match any alternative".into(),
                    }),
                }
            }
        }
    }

    /// Renders the schema as a JSON Schema fragment.
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::Any => json!({}),
            Self::String { constraints, valid } => {
                let mut m = Map::new();
                m.insert("type".into(), json!("string"));
                if let Some(min) = constraints.min_length {
                    m.insert("minLength".into(), json!(min));
                }
                if let Some(max) = constraints.max_length {
                    m.insert("maxLength".into(), json!(max));
                }
                if !valid.is_empty() {
                    m.insert("enum".into(), json!(valid));
                }
                Value::Object(m)
            }
            Self::Integer(range) => {
                let mut m = Map::new();
                m.insert("type".into(), json!("integer"));
                if let Some(min) = range.min {
                    m.insert("minimum".into(), json!(min));
                }
                if let Some(max) = range.max {
                    m.insert("maximum".into(), json!(max));
                }
                Value::Object(m)
            }
            Self::Number => json!({"type": "number"}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::Date => json!({"type": "string", "format": "date"}),
            Self::DateTime => json!({"type": "string", "format": "date-time"}),
            Self::Array(item) => json!({"type": "array", "items": item.to_json_schema()}),
            Self::Object(obj) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for (name, prop) in &obj.properties {
                    let mut rendered = prop.schema.to_json_schema();
                    if let (Some(desc), Value::Object(m)) = (&prop.description, &mut rendered) {
                        m.insert("description".into(), json!(desc));
                    }
                    properties.insert(name.clone(), rendered);
                    if prop.required {
                        required.push(json!(name));
                    }
                }
                let mut m = Map::new();
                m.insert("type".into(), json!("object"));
                m.insert("properties".into(), Value::Object(properties));
                if !required.is_empty() {
                    m.insert("required".into(), Value::Array(required));
                }
                m.insert("additionalProperties".into(), json!(obj.allow_unknown));
                Value::Object(m)
            }
            Self::Alternatives(branches) => json!({
                "anyOf": branches.iter().map(Schema::to_json_schema).collect::<Vec<_>>()
            }),
        }
    }
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}
