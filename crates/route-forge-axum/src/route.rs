//! Declarative route descriptors handed to the HTTP router.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use route_forge_backend::AuthContext;
use route_forge_core::schema::Schema;
use route_forge_core::types::{ModelName, Verb};
use serde_json::{json, Value};

use crate::headers::HeaderValidator;

/// Role requirement of an authenticated route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    One(String),
    Any(Vec<String>),
}

impl Scope {
    /// Collapses a single-element set to a scalar; `None` for an empty set.
    pub fn from_roles(roles: &[String]) -> Option<Self> {
        match roles {
            [] => None,
            [one] => Some(Self::One(one.clone())),
            many => Some(Self::Any(many.to_vec())),
        }
    }

    pub fn permits(&self, auth: &AuthContext) -> bool {
        match self {
            Self::One(scope) => auth.has_scope(scope),
            Self::Any(scopes) => auth.has_any_scope(scopes),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Self::One(s) => json!(s),
            Self::Any(v) => json!(v),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(s) => write!(f, "{s}"),
            Self::Any(v) => write!(f, "{}", v.join("|")),
        }
    }
}

/// Authentication requirement of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    Disabled,
    Required {
        strategy: String,
        scope: Option<Scope>,
    },
}

impl AuthConfig {
    /// `false` when disabled, `{ strategy, scope? }` otherwise.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Disabled => Value::Bool(false),
            Self::Required { strategy, scope } => {
                let mut out = json!({ "strategy": strategy });
                if let Some(scope) = scope {
                    out["scope"] = scope.to_json();
                }
                out
            }
        }
    }
}

/// What answers a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerRef {
    Model { model: ModelName, verb: Verb },
    CsrfToken,
}

/// Validation rules applied before the handler runs.
#[derive(Debug, Clone)]
pub struct Validation {
    /// Header rules as of route generation.
    pub headers: Arc<HeaderValidator>,
    pub params: Option<Schema>,
    pub payload: Option<Schema>,
}

/// One documented response of a route.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSpec {
    pub description: String,
    pub schema: Option<Schema>,
}

#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub auth: AuthConfig,
    pub validation: Validation,
    /// Alternatives a response body may take.
    pub response: Schema,
    pub response_codes: BTreeMap<u16, ResponseSpec>,
    pub description: String,
    pub notes: Vec<String>,
    pub tags: Vec<String>,
    pub produces: Vec<String>,
    /// Body read deadline; `None` for GET.
    pub payload_timeout: Option<Duration>,
    /// Raised body limit for upload routes.
    pub max_body_bytes: Option<usize>,
}

/// Method plus path template. `{id?}` marks an optional trailing segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    pub method: String,
    pub path: String,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    pub path: String,
    pub handler: HandlerRef,
    pub config: RouteConfig,
}

pub const OPTIONAL_ID_SEGMENT: &str = "/{id?}";

impl RouteDescriptor {
    pub fn key(&self) -> RouteKey {
        RouteKey {
            method: self.method.to_string(),
            path: self.path.clone(),
        }
    }

    /// Concrete axum paths this descriptor is mounted on. An optional id
    /// segment expands to the collection path and the item path.
    pub fn mount_paths(&self) -> Vec<String> {
        match self.path.strip_suffix(OPTIONAL_ID_SEGMENT) {
            Some(base) => {
                let base = if base.is_empty() { "/" } else { base };
                vec![base.to_string(), format!("{}/{{id}}", base.trim_end_matches('/'))]
            }
            None => vec![self.path.clone()],
        }
    }

    /// Documentation metadata rendered as JSON.
    pub fn documentation(&self) -> Value {
        let responses: serde_json::Map<String, Value> = self
            .config
            .response_codes
            .iter()
            .map(|(code, spec)| {
                let mut entry = json!({ "description": spec.description });
                if let Some(schema) = &spec.schema {
                    entry["schema"] = schema.to_json_schema();
                }
                (code.to_string(), entry)
            })
            .collect();

        let mut validate = json!({
            "headers": self.config.validation.headers.to_schema().to_json_schema(),
        });
        if let Some(params) = &self.config.validation.params {
            validate["params"] = params.to_json_schema();
        }
        if let Some(payload) = &self.config.validation.payload {
            validate["payload"] = payload.to_json_schema();
        }

        let mut doc = json!({
            "method": self.method.as_str(),
            "path": self.path,
            "description": self.config.description,
            "notes": self.config.notes,
            "tags": self.config.tags,
            "auth": self.config.auth.to_json(),
            "produces": self.config.produces,
            "validate": validate,
            "responses": responses,
        });
        if let Some(timeout) = self.config.payload_timeout {
            doc["payload_timeout_ms"] = json!(timeout.as_millis() as u64);
        }
        doc
    }
}

/// Human reason phrase for a documented status code.
pub fn reason_phrase(code: u16) -> String {
    StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(path: &str) -> RouteDescriptor {
        RouteDescriptor {
            method: Method::GET,
            path: path.to_string(),
            handler: HandlerRef::CsrfToken,
            config: RouteConfig {
                auth: AuthConfig::Disabled,
                validation: Validation {
                    headers: Arc::new(HeaderValidator::with_defaults()),
                    params: None,
                    payload: None,
                },
                response: Schema::any_object(),
                response_codes: BTreeMap::from([(
                    200,
                    ResponseSpec {
                        description: reason_phrase(200),
                        schema: Some(Schema::any_object()),
                    },
                )]),
                description: "Get a crumb".into(),
                notes: vec![],
                tags: vec!["csrf".into()],
                produces: vec!["application/json".into()],
                payload_timeout: None,
                max_body_bytes: None,
            },
        }
    }

    #[test]
    fn scope_collapses_single_role() {
        assert_eq!(Scope::from_roles(&[]), None);
        assert_eq!(
            Scope::from_roles(&["admin".to_string()]),
            Some(Scope::One("admin".into()))
        );
        assert_eq!(
            Scope::from_roles(&["admin".to_string(), "user".to_string()]),
            Some(Scope::Any(vec!["admin".into(), "user".into()]))
        );
    }

    #[test]
    fn scope_permits_matching_context() {
        let ctx = AuthContext::new("u", vec!["user".into()]);
        assert!(Scope::Any(vec!["admin".into(), "user".into()]).permits(&ctx));
        assert!(!Scope::One("admin".into()).permits(&ctx));
    }

    #[test]
    fn auth_config_json() {
        assert_eq!(AuthConfig::Disabled.to_json(), json!(false));
        let required = AuthConfig::Required {
            strategy: "bearer".into(),
            scope: Some(Scope::One("admin".into())),
        };
        assert_eq!(required.to_json(), json!({"strategy": "bearer", "scope": "admin"}));
    }

    #[test]
    fn optional_id_mounts_twice() {
        assert_eq!(
            descriptor("/api/test/{id?}").mount_paths(),
            ["/api/test", "/api/test/{id}"]
        );
        assert_eq!(descriptor("/test/{id}").mount_paths(), ["/test/{id}"]);
    }

    #[test]
    fn documentation_contains_metadata() {
        let doc = descriptor("/csrf").documentation();
        assert_eq!(doc["method"], "GET");
        assert_eq!(doc["path"], "/csrf");
        assert_eq!(doc["auth"], json!(false));
        assert_eq!(doc["responses"]["200"]["description"], "OK");
        assert!(doc["validate"]["headers"]["properties"]["accept"].is_object());
        assert!(doc.get("payload_timeout_ms").is_none());
    }

    #[test]
    fn route_key_display() {
        assert_eq!(descriptor("/csrf").key().to_string(), "GET /csrf");
    }
}
