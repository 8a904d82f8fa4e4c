//! The HTTP surface routes are mounted on, and request injection for
//! in-process testing.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, Request, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::middleware::from_fn_with_state;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::csrf;
use crate::error::{ApiError, ServerError};
use crate::guard;
use crate::handlers::{self, RouteContext};
use crate::models::ModelSet;
use crate::rate_limit;
use crate::route::{HandlerRef, RouteDescriptor, RouteKey};
use crate::state::ForgeState;

/// Collects routes into an axum [`Router`], refusing to mount the same
/// method and path twice.
#[derive(Default)]
pub struct HttpRouter {
    router: Router<ForgeState>,
    routes: Vec<RouteDescriptor>,
    mounted: HashSet<RouteKey>,
}

impl std::fmt::Debug for HttpRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRouter")
            .field("routes", &self.routes.len())
            .field("mounted", &self.mounted.len())
            .finish()
    }
}

impl HttpRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptors registered so far, in registration order.
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn is_mounted(&self, method: &Method, path: &str) -> bool {
        self.mounted.contains(&RouteKey {
            method: method.to_string(),
            path: path.to_string(),
        })
    }

    fn claim(&mut self, method: &Method, paths: &[String]) -> Result<(), ServerError> {
        for path in paths {
            if self.is_mounted(method, path) {
                return Err(ServerError::DuplicateRoute {
                    method: method.to_string(),
                    path: path.clone(),
                });
            }
        }
        for path in paths {
            self.mounted.insert(RouteKey {
                method: method.to_string(),
                path: path.clone(),
            });
        }
        Ok(())
    }

    /// Mounts a generated route.
    pub fn register(&mut self, descriptor: RouteDescriptor, models: &ModelSet) -> Result<(), ServerError> {
        let filter = MethodFilter::try_from(descriptor.method.clone())
            .map_err(|_| ServerError::UnsupportedMethod(descriptor.method.to_string()))?;
        let paths = descriptor.mount_paths();

        let handler_ctx = match &descriptor.handler {
            HandlerRef::Model { model, verb } => {
                let registration = models.get(model).ok_or_else(|| ServerError::Hook {
                    model: model.to_string(),
                    message: "model is not registered".into(),
                })?;
                Some(Arc::new(RouteContext {
                    model: registration.descriptor.clone(),
                    verb: *verb,
                    config: descriptor.config.clone(),
                }))
            }
            HandlerRef::CsrfToken => None,
        };

        self.claim(&descriptor.method, &paths)?;

        for path in &paths {
            let mut method_router = match &handler_ctx {
                Some(ctx) => model_route(filter, path, ctx.clone()),
                None => on(filter, csrf::crumb_handler),
            };
            if let Some(limit) = descriptor.config.max_body_bytes {
                method_router = method_router.layer(DefaultBodyLimit::max(limit));
            }
            self.router = std::mem::take(&mut self.router).route(path, method_router);
        }

        tracing::debug!(route = %descriptor.key(), "route registered");
        self.routes.push(descriptor);
        Ok(())
    }

    /// Mounts several routes, stopping at the first failure.
    pub fn register_batch(
        &mut self,
        descriptors: impl IntoIterator<Item = RouteDescriptor>,
        models: &ModelSet,
    ) -> Result<(), ServerError> {
        for descriptor in descriptors {
            self.register(descriptor, models)?;
        }
        Ok(())
    }

    /// Mounts a hand-written route. It is not documented.
    pub fn raw_route(
        &mut self,
        method: Method,
        path: &str,
        handler: MethodRouter<ForgeState>,
    ) -> Result<&mut Self, ServerError> {
        self.claim(&method, &[path.to_string()])?;
        self.router = std::mem::take(&mut self.router).route(path, handler);
        Ok(self)
    }

    /// Applies an arbitrary transformation to the underlying router.
    pub fn map_router(&mut self, f: impl FnOnce(Router<ForgeState>) -> Router<ForgeState>) {
        self.router = f(std::mem::take(&mut self.router));
    }

    /// The finished service: registered routes, a JSON 404 fallback, auth
    /// and anti-forgery middleware, all behind the rate limiter.
    pub fn service(&self, state: ForgeState) -> Router {
        self.router
            .clone()
            .fallback(not_found)
            .layer(from_fn_with_state(state.clone(), csrf::csrf_middleware))
            .layer(from_fn_with_state(state.clone(), guard::auth_middleware))
            .layer(from_fn_with_state(state.clone(), rate_limit::rate_limit_middleware))
            .with_state(state)
    }
}

fn model_route(filter: MethodFilter, path: &str, ctx: Arc<RouteContext>) -> MethodRouter<ForgeState> {
    if path.contains("{id}") {
        on(
            filter,
            move |State(state): State<ForgeState>, Path(id): Path<String>, request: Request| {
                let ctx = ctx.clone();
                async move { handlers::handle(state, ctx, Some(id), request).await }
            },
        )
    } else {
        on(
            filter,
            move |State(state): State<ForgeState>, request: Request| {
                let ctx = ctx.clone();
                async move { handlers::handle(state, ctx, None, request).await }
            },
        )
    }
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::RouteNotFound {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

/// A request handed to a service without going over the network.
#[derive(Debug, Clone)]
pub struct InjectRequest {
    pub method: Method,
    /// Path plus optional query string.
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub payload: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct InjectResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// The body parsed as JSON; `None` when empty or not JSON.
    pub result: Option<Value>,
}

/// Dispatches requests in-process.
pub trait RequestInjector: Send + Sync {
    fn inject(
        &self,
        request: InjectRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InjectResponse, ApiError>> + Send + '_>>;
}

impl RequestInjector for Router {
    fn inject(
        &self,
        request: InjectRequest,
    ) -> Pin<Box<dyn Future<Output = Result<InjectResponse, ApiError>> + Send + '_>> {
        let router = self.clone();
        Box::pin(async move {
            let mut builder = axum::http::Request::builder()
                .method(request.method)
                .uri(request.url.as_str());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            let body = match &request.payload {
                Some(payload) => Body::from(serde_json::to_vec(payload).map_err(|e| {
                    ApiError::Internal {
                        message: format!("payload is not serializable: {e}"),
                    }
                })?),
                None => Body::empty(),
            };
            let http_request = builder.body(body).map_err(|e| ApiError::Internal {
                message: format!("malformed injected request: {e}"),
            })?;

            let response = match router.oneshot(http_request).await {
                Ok(response) => response,
                Err(never) => match never {},
            };
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| ApiError::Internal {
                    message: format!("failed to read response body: {e}"),
                })?
                .to_bytes();
            let result = serde_json::from_slice(&body).ok();
            Ok(InjectResponse {
                status,
                headers,
                body,
                result,
            })
        })
    }
}
