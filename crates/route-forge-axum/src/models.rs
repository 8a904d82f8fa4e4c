//! The set of models a server generates routes for.

use std::fmt;
use std::sync::Arc;

use route_forge_core::types::{ModelDescriptor, ModelName};

use crate::error::ServerError;
use crate::router::HttpRouter;
use crate::state::ForgeState;

/// Registers extra routes for a model after its generated ones.
pub type CustomRouteHook =
    Arc<dyn Fn(&mut HttpRouter, &ForgeState) -> Result<(), ServerError> + Send + Sync>;

#[derive(Clone)]
pub struct ModelRegistration {
    pub descriptor: Arc<ModelDescriptor>,
    pub custom_routes: Option<CustomRouteHook>,
}

impl fmt::Debug for ModelRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistration")
            .field("descriptor", &self.descriptor.name())
            .field("custom_routes", &self.custom_routes.is_some())
            .finish()
    }
}

/// Models in registration order, unique by name.
#[derive(Debug, Clone, Default)]
pub struct ModelSet {
    models: Vec<ModelRegistration>,
}

impl ModelSet {
    pub fn builder() -> ModelSetBuilder {
        ModelSetBuilder::default()
    }

    pub fn get(&self, name: &ModelName) -> Option<&ModelRegistration> {
        self.models.iter().find(|m| m.descriptor.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelRegistration> {
        self.models.iter()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Default)]
pub struct ModelSetBuilder {
    models: Vec<ModelRegistration>,
}

impl ModelSetBuilder {
    pub fn model(self, descriptor: ModelDescriptor) -> Self {
        self.push(descriptor, None)
    }

    pub fn model_with_routes<F>(self, descriptor: ModelDescriptor, hook: F) -> Self
    where
        F: Fn(&mut HttpRouter, &ForgeState) -> Result<(), ServerError> + Send + Sync + 'static,
    {
        self.push(descriptor, Some(Arc::new(hook)))
    }

    fn push(mut self, descriptor: ModelDescriptor, custom_routes: Option<CustomRouteHook>) -> Self {
        self.models.push(ModelRegistration {
            descriptor: Arc::new(descriptor),
            custom_routes,
        });
        self
    }

    pub fn build(self) -> Result<ModelSet, ServerError> {
        let mut seen = std::collections::HashSet::new();
        for model in &self.models {
            if !seen.insert(model.descriptor.name().clone()) {
                return Err(ServerError::DuplicateModel(model.descriptor.name().to_string()));
            }
        }
        Ok(ModelSet {
            models: self.models,
        })
    }
}
