//! Per-verb routing metadata.
//!
//! The verb table is data: one [`VerbSpec`] per [`Verb`]. A
//! [`VerbDescriptor`] combines a spec with a model and the generation
//! context to produce a [`RouteDescriptor`].

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::Method;
use route_forge_core::schema::{ObjectSchema, Schema};
use route_forge_core::types::{ModelDescriptor, Verb};

use crate::config::ServerSettings;
use crate::headers::HeaderValidator;
use crate::route::{
    reason_phrase, AuthConfig, HandlerRef, ResponseSpec, RouteConfig, RouteDescriptor, Scope,
    Validation,
};
use crate::validation::json::id_schema;
use crate::validation::ValidatorRegistry;

/// Whether a verb's path carries the record id after the model name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdSegment {
    /// `/{model}`
    None,
    /// `/{model}/{id?}`: with an id it addresses one record, without it the list.
    Optional,
    /// `/{model}/{id}`
    Required,
}

/// Read verbs only honour per-verb roles; write verbs fall back to the
/// model-wide role set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl Access {
    /// The tag attached to generated routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

/// One row of the verb table.
#[derive(Debug)]
pub struct VerbSpec {
    pub verb: Verb,
    /// HTTP method the route is mounted under.
    pub method: Method,
    pub id: IdSegment,
    /// Trailing path segment, e.g. `upload`.
    pub suffix: Option<&'static str>,
    pub access: Access,
    /// Documented response codes, in ascending order.
    pub codes: &'static [u16],
    /// `{model}` is replaced with the model name.
    pub description: &'static str,
    pub notes: &'static str,
}

/// Looks up the table entry for `verb`.
pub fn spec(verb: Verb) -> VerbSpec {
    match verb {
        Verb::Get => VerbSpec {
            verb,
            method: Method::GET,
            id: IdSegment::Optional,
            suffix: None,
            access: Access::Read,
            codes: &[200, 400, 404, 500],
            description: "Get a paginated list of \"{model}\"",
            notes: "Returns a single \"{model}\" when an id is given, otherwise every match",
        },
        Verb::Post => VerbSpec {
            verb,
            method: Method::POST,
            id: IdSegment::None,
            suffix: None,
            access: Access::Write,
            codes: &[200, 201, 400, 500],
            description: "Create a new \"{model}\"",
            notes: "Creates a \"{model}\" from the payload",
        },
        Verb::Put => VerbSpec {
            verb,
            method: Method::PUT,
            id: IdSegment::Required,
            suffix: None,
            access: Access::Write,
            codes: &[200, 202, 400, 404, 500],
            description: "Replace a \"{model}\"",
            notes: "Replaces the \"{model}\" with this id, creating it when missing",
        },
        Verb::Patch => VerbSpec {
            verb,
            method: Method::PATCH,
            id: IdSegment::Required,
            suffix: None,
            access: Access::Write,
            codes: &[200, 202, 400, 404, 500],
            description: "Update a \"{model}\"",
            notes: "Updates the given fields of a \"{model}\"",
        },
        Verb::Delete => VerbSpec {
            verb,
            method: Method::DELETE,
            id: IdSegment::Required,
            suffix: None,
            access: Access::Write,
            codes: &[202, 204, 400, 404, 500],
            description: "Delete a \"{model}\"",
            notes: "Deletes the \"{model}\" with this id",
        },
        Verb::Upload => VerbSpec {
            verb,
            method: Method::POST,
            id: IdSegment::Required,
            suffix: Some("upload"),
            access: Access::Write,
            codes: &[202, 400, 404, 500],
            description: "Upload a file to a \"{model}\"",
            notes: "Multipart form with a \"file\" part; stores the file and records its location",
        },
    }
}

/// Everything a descriptor needs besides the model.
#[derive(Debug, Clone)]
pub struct GenerationContext {
    /// Header rules as of generation.
    pub headers: Arc<HeaderValidator>,
    pub validators: Arc<ValidatorRegistry>,
    /// Strategy name of the configured auth provider.
    pub auth_strategy: Option<String>,
    pub settings: Arc<ServerSettings>,
}

/// A verb bound to one model: derives the path, auth requirement,
/// response-code table and tags of that model's route.
pub struct VerbDescriptor<'a> {
    model: &'a ModelDescriptor,
    spec: VerbSpec,
    ctx: &'a GenerationContext,
}

impl<'a> VerbDescriptor<'a> {
    pub fn new(model: &'a ModelDescriptor, verb: Verb, ctx: &'a GenerationContext) -> Self {
        Self {
            model,
            spec: spec(verb),
            ctx,
        }
    }

    pub fn verb(&self) -> Verb {
        self.spec.verb
    }

    pub fn path(&self) -> String {
        let mut path = format!("{}/{}", self.ctx.settings.normalized_prefix(), self.model.name());
        match self.spec.id {
            IdSegment::None => {}
            IdSegment::Optional => path.push_str("/{id?}"),
            IdSegment::Required => path.push_str("/{id}"),
        }
        if let Some(suffix) = self.spec.suffix {
            path.push('/');
            path.push_str(suffix);
        }
        path
    }

    /// Per-verb roles win; model-wide roles apply to write verbs only.
    pub fn auth_config(&self) -> AuthConfig {
        let Some(strategy) = &self.ctx.auth_strategy else {
            return AuthConfig::Disabled;
        };
        let roles = self.model.roles();
        let scope = match roles.for_verb(self.spec.verb) {
            Some(set) => Scope::from_roles(set),
            None if self.spec.access == Access::Write => Scope::from_roles(roles.model_wide_roles()),
            None => None,
        };
        AuthConfig::Required {
            strategy: strategy.clone(),
            scope,
        }
    }

    pub fn response_code_table(&self) -> BTreeMap<u16, ResponseSpec> {
        let success = self.ctx.validators.response_schema_alternatives(self.model);
        let failure = self.ctx.validators.error_schema_alternatives();
        self.spec
            .codes
            .iter()
            .map(|&code| {
                let schema = match code {
                    204 => None,
                    200..=299 => Some(success.clone()),
                    _ => failure.clone(),
                };
                (
                    code,
                    ResponseSpec {
                        description: reason_phrase(code),
                        schema,
                    },
                )
            })
            .collect()
    }

    pub fn tags(&self) -> Vec<String> {
        let mut tags = vec![
            self.model.name().to_string(),
            self.spec.access.as_str().to_string(),
        ];
        if self.spec.verb == Verb::Upload {
            tags.push("file_upload".to_string());
        }
        tags
    }

    fn params_schema(&self) -> Option<Schema> {
        let required = match self.spec.id {
            IdSegment::None => return None,
            IdSegment::Optional => false,
            IdSegment::Required => true,
        };
        Some(Schema::Object(ObjectSchema::new().property("id", id_schema(), required)))
    }

    fn render(&self, template: &str) -> String {
        template.replace("{model}", self.model.name().as_str())
    }

    pub fn route(&self) -> RouteDescriptor {
        let metadata = self.model.metadata(self.spec.verb);
        let description = metadata
            .and_then(|m| m.description.clone())
            .unwrap_or_else(|| self.render(self.spec.description));
        let notes = match metadata {
            Some(m) if !m.notes.is_empty() => m.notes.clone(),
            _ => vec![self.render(self.spec.notes)],
        };
        let is_upload = self.spec.verb == Verb::Upload;

        RouteDescriptor {
            method: self.spec.method.clone(),
            path: self.path(),
            handler: HandlerRef::Model {
                model: self.model.name().clone(),
                verb: self.spec.verb,
            },
            config: RouteConfig {
                auth: self.auth_config(),
                validation: Validation {
                    headers: self.ctx.headers.clone(),
                    params: self.params_schema(),
                    payload: self
                        .ctx
                        .validators
                        .payload_schema_alternatives(self.model, self.spec.verb),
                },
                response: self.ctx.validators.response_schema_alternatives(self.model),
                response_codes: self.response_code_table(),
                description,
                notes,
                tags: self.tags(),
                produces: self.ctx.validators.content_types(),
                payload_timeout: (self.spec.method != Method::GET)
                    .then_some(self.ctx.settings.request_timeout),
                max_body_bytes: is_upload.then_some(self.ctx.settings.max_upload_bytes),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::json::JsonValidator;
    use route_forge_core::types::{ModelName, Roles, VerbMetadata};

    fn context(auth: Option<&str>, prefix: &str) -> GenerationContext {
        let mut validators = ValidatorRegistry::new();
        validators.push(Arc::new(JsonValidator::new()));
        GenerationContext {
            headers: Arc::new(HeaderValidator::with_defaults()),
            validators: Arc::new(validators),
            auth_strategy: auth.map(String::from),
            settings: Arc::new(ServerSettings {
                route_prefix: prefix.into(),
                ..ServerSettings::default()
            }),
        }
    }

    fn model(roles: Roles) -> ModelDescriptor {
        ModelDescriptor::builder(ModelName::new("test").unwrap())
            .roles(roles)
            .with_upload()
            .build()
            .unwrap()
    }

    #[test]
    fn paths_follow_table() {
        let ctx = context(None, "/api/");
        let m = model(Roles::default());
        let paths: Vec<_> = Verb::ALL
            .iter()
            .map(|v| VerbDescriptor::new(&m, *v, &ctx).path())
            .collect();
        assert_eq!(
            paths,
            [
                "/api/test/{id?}",
                "/api/test",
                "/api/test/{id}",
                "/api/test/{id}",
                "/api/test/{id}",
                "/api/test/{id}/upload",
            ]
        );
    }

    #[test]
    fn auth_disabled_without_provider() {
        let ctx = context(None, "");
        let m = model(Roles::model_wide(["admin"]));
        assert_eq!(
            VerbDescriptor::new(&m, Verb::Post, &ctx).auth_config(),
            AuthConfig::Disabled
        );
    }

    #[test]
    fn per_verb_roles_collapse_to_scalar() {
        let ctx = context(Some("bearer"), "");
        let m = model(Roles::default().with_verb(Verb::Get, ["admin"]));
        assert_eq!(
            VerbDescriptor::new(&m, Verb::Get, &ctx).auth_config(),
            AuthConfig::Required {
                strategy: "bearer".into(),
                scope: Some(Scope::One("admin".into())),
            }
        );
        assert_eq!(
            VerbDescriptor::new(&m, Verb::Post, &ctx).auth_config(),
            AuthConfig::Required {
                strategy: "bearer".into(),
                scope: None,
            }
        );
    }

    #[test]
    fn model_wide_roles_cover_write_verbs_only() {
        let ctx = context(Some("bearer"), "");
        let m = model(Roles::model_wide(["admin", "user"]));
        let expected = Some(Scope::Any(vec!["admin".into(), "user".into()]));
        for verb in [Verb::Post, Verb::Put, Verb::Patch, Verb::Delete, Verb::Upload] {
            let AuthConfig::Required { scope, .. } =
                VerbDescriptor::new(&m, verb, &ctx).auth_config()
            else {
                panic!("expected auth for {verb}");
            };
            assert_eq!(scope, expected, "{verb}");
        }
        let AuthConfig::Required { scope, .. } =
            VerbDescriptor::new(&m, Verb::Get, &ctx).auth_config()
        else {
            panic!("expected auth for GET");
        };
        assert_eq!(scope, None);
    }

    #[test]
    fn delete_no_content_has_no_schema() {
        let ctx = context(None, "");
        let m = model(Roles::default());
        let table = VerbDescriptor::new(&m, Verb::Delete, &ctx).response_code_table();
        assert_eq!(table.keys().copied().collect::<Vec<_>>(), [202, 204, 400, 404, 500]);
        assert!(table[&204].schema.is_none());
        assert!(table[&202].schema.is_some());
        assert!(table[&404]
            .schema
            .as_ref()
            .unwrap()
            .is_valid(&serde_json::json!({"error": "x", "message": "y"})));
    }

    #[test]
    fn tags_mark_access_and_uploads() {
        let ctx = context(None, "");
        let m = model(Roles::default());
        assert_eq!(VerbDescriptor::new(&m, Verb::Get, &ctx).tags(), ["test", "read"]);
        assert_eq!(
            VerbDescriptor::new(&m, Verb::Upload, &ctx).tags(),
            ["test", "write", "file_upload"]
        );
    }

    #[test]
    fn timeouts_skip_get() {
        let ctx = context(None, "");
        let m = model(Roles::default());
        assert!(VerbDescriptor::new(&m, Verb::Get, &ctx)
            .route()
            .config
            .payload_timeout
            .is_none());
        let upload = VerbDescriptor::new(&m, Verb::Upload, &ctx).route();
        assert_eq!(upload.config.payload_timeout, Some(ctx.settings.request_timeout));
        assert_eq!(upload.config.max_body_bytes, Some(210_000_000));
        assert!(upload.config.validation.payload.is_none());
    }

    #[test]
    fn metadata_overrides_generated_text() {
        let ctx = context(None, "");
        let m = ModelDescriptor::builder(ModelName::new("test").unwrap())
            .describe(
                Verb::Get,
                VerbMetadata {
                    description: Some("Browse tests".into()),
                    notes: vec![],
                },
            )
            .build()
            .unwrap();
        let get = VerbDescriptor::new(&m, Verb::Get, &ctx).route();
        assert_eq!(get.config.description, "Browse tests");
        assert_eq!(get.config.notes.len(), 1);
        let post = VerbDescriptor::new(&m, Verb::Post, &ctx).route();
        assert_eq!(post.config.description, "Create a new \"test\"");
    }

    #[test]
    fn params_require_id_except_for_get() {
        let ctx = context(None, "");
        let m = model(Roles::default());
        let get = VerbDescriptor::new(&m, Verb::Get, &ctx).route();
        let params = get.config.validation.params.unwrap();
        assert!(params.is_valid(&serde_json::json!({})));
        let patch = VerbDescriptor::new(&m, Verb::Patch, &ctx).route();
        assert!(!patch
            .config
            .validation
            .params
            .unwrap()
            .is_valid(&serde_json::json!({})));
        assert!(VerbDescriptor::new(&m, Verb::Post, &ctx)
            .route()
            .config
            .validation
            .params
            .is_none());
    }
}
