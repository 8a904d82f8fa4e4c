//! Pluggable request/response schema providers.
//!
//! Every registered [`SchemaValidator`] contributes alternatives to the
//! schemas of each generated route; the first one whose content type
//! matches a request's `Accept` header renders the response.

pub mod json;

use std::sync::Arc;

use route_forge_core::schema::Schema;
use route_forge_core::types::{ModelDescriptor, Verb};
use serde_json::Value;

/// A provider of payload and response schemas for one content type.
pub trait SchemaValidator: Send + Sync {
    /// Short identifier used in logs and flow-runner failures.
    fn name(&self) -> &str;

    /// Media type this validator renders, e.g. `application/json`.
    fn content_type(&self) -> &str;

    /// Schema of a single record of `model`, or `None` when this validator
    /// does not describe the model.
    fn response_schema(&self, model: &ModelDescriptor) -> Option<Schema>;

    /// Schema of the request body for `verb`, or `None` when the verb takes
    /// no body.
    fn payload_schema(&self, model: &ModelDescriptor, verb: Verb) -> Option<Schema>;

    /// Schema of the error body.
    fn error_schema(&self) -> Schema;

    /// Reshapes a response body before it is sent.
    fn decorate(&self, _model: &ModelDescriptor, body: Value) -> Value {
        body
    }
}

/// Ordered, append-only list of validators.
#[derive(Clone, Default)]
pub struct ValidatorRegistry {
    validators: Vec<Arc<dyn SchemaValidator>>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.name()))
            .finish()
    }
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, validator: Arc<dyn SchemaValidator>) {
        self.validators.push(validator);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SchemaValidator>> {
        self.validators.iter()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Item, list and error forms from every validator that describes
    /// `model`. Falls back to any object when none does.
    pub fn response_schema_alternatives(&self, model: &ModelDescriptor) -> Schema {
        let mut branches = Vec::new();
        for validator in &self.validators {
            if let Some(item) = validator.response_schema(model) {
                branches.push(item.clone());
                branches.push(Schema::array_of(item));
                branches.push(validator.error_schema());
            }
        }
        Schema::one_of(branches).unwrap_or_else(Schema::any_object)
    }

    pub fn payload_schema_alternatives(&self, model: &ModelDescriptor, verb: Verb) -> Option<Schema> {
        Schema::one_of(
            self.validators
                .iter()
                .filter_map(|v| v.payload_schema(model, verb))
                .collect(),
        )
    }

    pub fn error_schema_alternatives(&self) -> Option<Schema> {
        Schema::one_of(self.validators.iter().map(|v| v.error_schema()).collect())
    }

    /// The validator whose content type appears in `accept`, else the first
    /// registered one.
    pub fn negotiate(&self, accept: Option<&str>) -> Option<Arc<dyn SchemaValidator>> {
        let requested = accept.into_iter().flat_map(|a| a.split(',')).filter_map(|part| {
            let media = part.split(';').next()?.trim();
            (!media.is_empty()).then_some(media)
        });
        for media in requested {
            if let Some(found) = self
                .validators
                .iter()
                .find(|v| v.content_type().eq_ignore_ascii_case(media))
            {
                return Some(found.clone());
            }
        }
        self.validators.first().cloned()
    }

    /// The `produces` list for route documentation.
    pub fn content_types(&self) -> Vec<String> {
        self.validators
            .iter()
            .map(|v| v.content_type().to_string())
            .collect()
    }
}
