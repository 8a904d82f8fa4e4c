pub mod auth;
pub mod config;
pub mod csrf;
pub mod error;
pub mod events;
pub mod flow;
pub mod generator;
pub mod guard;
pub mod handlers;
pub mod headers;
pub mod models;
pub mod rate_limit;
pub mod robots;
pub mod route;
pub mod router;
pub mod server;
pub mod state;
pub mod validation;
pub mod verbs;

pub use auth::{AuthProvider, StaticTokenProvider};
pub use config::{CsrfSettings, RateLimitSettings, ServerSettings};
pub use error::{ApiError, ServerError};
pub use events::ServerEvent;
pub use flow::{synthesize_payload, Expectation, FlowFailure, FlowRunner, FlowTask, Predicate};
pub use headers::{HeaderRule, HeaderValidator};
pub use models::{ModelRegistration, ModelSet};
pub use route::{RouteDescriptor, RouteKey};
pub use router::{HttpRouter, InjectRequest, InjectResponse, RequestInjector};
pub use server::{ForgeServer, ForgeServerBuilder, Plugin};
pub use state::{DynFileStorage, DynModelStore, ForgeState};
pub use validation::json::JsonValidator;
pub use validation::{SchemaValidator, ValidatorRegistry};
