//! Turns model descriptors into route descriptors.

use axum::http::Method;
use route_forge_core::types::ModelDescriptor;

use crate::csrf::CSRF_PATH;
use crate::route::{AuthConfig, HandlerRef, RouteConfig, RouteDescriptor, Validation};
use crate::verbs::{GenerationContext, VerbDescriptor};

/// Builds the descriptors for every model against one generation context.
pub struct RouteGenerator<'a> {
    ctx: &'a GenerationContext,
}

impl<'a> RouteGenerator<'a> {
    pub fn new(ctx: &'a GenerationContext) -> Self {
        Self { ctx }
    }

    /// One descriptor per enabled verb, in verb-table order. Models that
    /// are not routable yield nothing.
    pub fn model_routes(&self, model: &ModelDescriptor) -> Vec<RouteDescriptor> {
        if !model.is_routable() {
            tracing::debug!(model = %model.name(), "skipping non-routable model");
            return Vec::new();
        }
        model
            .enabled_verbs()
            .map(|verb| VerbDescriptor::new(model, verb, self.ctx).route())
            .collect()
    }

    /// The crumb-issuing route. Unprefixed and never authenticated.
    pub fn csrf_route(&self) -> RouteDescriptor {
        RouteDescriptor {
            method: Method::GET,
            path: CSRF_PATH.to_string(),
            handler: HandlerRef::CsrfToken,
            config: RouteConfig {
                auth: AuthConfig::Disabled,
                validation: Validation {
                    headers: self.ctx.headers.clone(),
                    params: None,
                    payload: None,
                },
                response: route_forge_core::schema::Schema::any_object(),
                response_codes: Default::default(),
                description: "Issue an anti-forgery token".into(),
                notes: vec!["Send the crumb back in the x-csrf-token header".into()],
                tags: vec!["csrf".into()],
                produces: vec!["application/json".into()],
                payload_timeout: None,
                max_body_bytes: None,
            },
        }
    }
}
