use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::Method;
use axum::routing::get;
use axum::Router;
use route_forge_backend::{FileStorage, ModelStore};
use route_forge_core::types::Verb;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use crate::auth::AuthProvider;
use crate::config::ServerSettings;
use crate::csrf::{CsrfGuard, CSRF_HEADER};
use crate::error::ServerError;
use crate::events::{EventBus, ServerEvent};
use crate::flow::FlowRunner;
use crate::generator::RouteGenerator;
use crate::headers::{HeaderRule, HeaderValidator};
use crate::models::ModelSet;
use crate::rate_limit::RateLimit;
use crate::robots::{self, ROBOTS_PATH};
use crate::route::RouteDescriptor;
use crate::router::HttpRouter;
use crate::state::{DynFileStorage, DynModelStore, ForgeState};
use crate::validation::json::JsonValidator;
use crate::validation::{SchemaValidator, ValidatorRegistry};
use crate::verbs::GenerationContext;

/// Setup-time extension of a [`ForgeServer`], typically adding header rules
/// or validators before routes are generated.
pub trait Plugin {
    fn name(&self) -> &str;

    fn register(&self, server: &mut ForgeServer) -> Result<(), ServerError>;
}

struct Generated {
    router: HttpRouter,
    state: ForgeState,
}

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Generates CRUD routes for a [`ModelSet`] and serves them.
///
/// Usage:
/// ```rust,ignore
/// let mut server = ForgeServer::builder()
///     .with_models(models)
///     .with_store(MemoryStore::default())
///     .build()?;
/// server.generate_routes()?;
/// let addr = server.start("127.0.0.1:8080".parse()?).await?;
/// ```
pub struct ForgeServer {
    settings: Arc<ServerSettings>,
    models: Arc<ModelSet>,
    store: Arc<dyn DynModelStore>,
    storage: Option<Arc<dyn DynFileStorage>>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
    csrf: Option<Arc<CsrfGuard>>,
    rate_limit: Option<Arc<RateLimit>>,
    headers: HeaderValidator,
    validators: ValidatorRegistry,
    events: EventBus,
    generated: Option<Generated>,
    running: Option<Running>,
}

impl std::fmt::Debug for ForgeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForgeServer")
            .field("models", &self.models.len())
            .field("validators", &self.validators)
            .field("generated", &self.generated.is_some())
            .field("running", &self.running.as_ref().map(|r| r.addr))
            .finish_non_exhaustive()
    }
}

/// Builder for [`ForgeServer`].
#[derive(Default)]
pub struct ForgeServerBuilder {
    settings: ServerSettings,
    models: ModelSet,
    store: Option<Arc<dyn DynModelStore>>,
    storage: Option<Arc<dyn DynFileStorage>>,
    auth_provider: Option<Arc<dyn AuthProvider>>,
}

impl ForgeServerBuilder {
    pub fn with_settings(mut self, settings: ServerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models = models;
        self
    }

    /// Set the data layer used by every generated handler.
    pub fn with_store<S: ModelStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Required when any model accepts uploads.
    pub fn with_storage<F: FileStorage + 'static>(mut self, storage: F) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Turns on authentication for every generated route.
    pub fn with_auth_provider<P: AuthProvider + 'static>(mut self, provider: P) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Returns an error if no store was provided.
    pub fn build(self) -> Result<ForgeServer, ServerError> {
        let store = self.store.ok_or(ServerError::MissingStore)?;
        let csrf = CsrfGuard::from_settings(&self.settings.csrf)?.map(Arc::new);
        let rate_limit = self
            .settings
            .rate_limiting
            .as_ref()
            .map(RateLimit::new)
            .transpose()?
            .map(Arc::new);
        let mut validators = ValidatorRegistry::new();
        validators.push(Arc::new(JsonValidator::new()));

        Ok(ForgeServer {
            settings: Arc::new(self.settings),
            models: Arc::new(self.models),
            store,
            storage: self.storage,
            auth_provider: self.auth_provider,
            csrf,
            rate_limit,
            headers: HeaderValidator::with_defaults(),
            validators,
            events: EventBus::default(),
            generated: None,
            running: None,
        })
    }
}

impl ForgeServer {
    pub fn builder() -> ForgeServerBuilder {
        ForgeServerBuilder::default()
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    pub fn models(&self) -> &ModelSet {
        &self.models
    }

    pub fn headers(&self) -> &HeaderValidator {
        &self.headers
    }

    /// Changes made after [`generate_routes`](Self::generate_routes) do not
    /// affect routes already generated.
    pub fn headers_mut(&mut self) -> &mut HeaderValidator {
        &mut self.headers
    }

    pub fn add_validator<V: SchemaValidator + 'static>(&mut self, validator: V) -> &mut Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }

    pub fn use_plugin(&mut self, plugin: &dyn Plugin) -> Result<(), ServerError> {
        tracing::debug!(plugin = plugin.name(), "registering plugin");
        plugin.register(self).map_err(|e| ServerError::Plugin {
            name: plugin.name().to_string(),
            message: e.to_string(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    /// Generates and registers every route. A second call logs a warning and
    /// does nothing. Nothing is committed when any step fails.
    pub fn generate_routes(&mut self) -> Result<(), ServerError> {
        if self.generated.is_some() {
            tracing::warn!("routes already generated; ignoring repeated call");
            return Ok(());
        }

        let mut headers = self.headers.clone();
        if let Some(guard) = &self.csrf {
            headers.set(
                CSRF_HEADER,
                HeaderRule::optional()
                    .with_default(guard.issue())
                    .describe("Anti-forgery crumb from GET /csrf"),
            );
        }
        let headers = Arc::new(headers);
        let validators = Arc::new(self.validators.clone());

        let state = ForgeState {
            models: self.models.clone(),
            store: self.store.clone(),
            storage: self.storage.clone(),
            validators: validators.clone(),
            headers: headers.clone(),
            auth_provider: self.auth_provider.clone(),
            csrf: self.csrf.clone(),
            rate_limit: self.rate_limit.clone(),
            settings: self.settings.clone(),
        };
        let ctx = GenerationContext {
            headers: headers.clone(),
            validators,
            auth_strategy: self.auth_provider.as_ref().map(|p| p.strategy().to_string()),
            settings: self.settings.clone(),
        };
        let generator = RouteGenerator::new(&ctx);
        let mut router = HttpRouter::new();

        if self.csrf.is_some() {
            router.register(generator.csrf_route(), &self.models)?;
        }
        if self.settings.robots {
            router.raw_route(Method::GET, ROBOTS_PATH, get(robots::robots_txt))?;
        }

        for registration in self.models.iter() {
            let model = &registration.descriptor;
            if model.is_routable() && model.verb_enabled(Verb::Upload) && self.storage.is_none() {
                return Err(ServerError::MissingStorage {
                    model: model.name().to_string(),
                });
            }

            let routes = generator.model_routes(model);
            tracing::info!(model = %model.name(), routes = routes.len(), "generating routes");
            router.register_batch(routes, &self.models)?;

            if let Some(hook) = &registration.custom_routes {
                hook(&mut router, &state).map_err(|e| match e {
                    ServerError::Hook { .. } => e,
                    other => ServerError::Hook {
                        model: model.name().to_string(),
                        message: other.to_string(),
                    },
                })?;
            }
        }

        let routes = router.routes().iter().map(RouteDescriptor::key).collect();
        self.headers = (*headers).clone();
        self.generated = Some(Generated { router, state });
        self.events.emit(ServerEvent::RoutesGenerated { routes });
        Ok(())
    }

    /// Generated route descriptors; empty before generation.
    pub fn routes(&self) -> &[RouteDescriptor] {
        self.generated
            .as_ref()
            .map(|g| g.router.routes())
            .unwrap_or(&[])
    }

    /// The complete axum service.
    pub fn service(&self) -> Result<Router, ServerError> {
        let generated = self.generated.as_ref().ok_or(ServerError::RoutesNotGenerated)?;
        Ok(generated.router.service(generated.state.clone()))
    }

    /// A runner that injects requests into the generated service.
    pub fn flow_runner(&self) -> Result<FlowRunner, ServerError> {
        let generated = self.generated.as_ref().ok_or(ServerError::RoutesNotGenerated)?;
        Ok(FlowRunner::new(
            Arc::new(self.service()?),
            generated.state.headers.clone(),
            generated.state.validators.clone(),
            self.settings.normalized_prefix(),
        ))
    }

    /// Address the server is listening on, when running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }

    /// Generates routes if needed, binds `addr` and serves in a background
    /// task. Returns the bound address.
    pub async fn start(&mut self, addr: SocketAddr) -> Result<SocketAddr, ServerError> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyRunning);
        }
        if self.generated.is_none() {
            self.generate_routes()?;
        }
        let app = self.service()?;

        self.events.emit(ServerEvent::ServerStarting);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        let local = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
                .with_graceful_shutdown(async {
                    let _ = signal.await;
                })
                .await
        });

        self.running = Some(Running {
            addr: local,
            shutdown,
            task,
        });
        tracing::info!(addr = %local, "server started");
        self.events.emit(ServerEvent::ServerStarted { addr: local });
        Ok(local)
    }

    /// Stops a running server and waits for in-flight requests.
    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let running = self.running.take().ok_or(ServerError::NotRunning)?;
        self.events.emit(ServerEvent::ServerStopping);
        let _ = running.shutdown.send(());
        match running.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ServerError::Serve(e.to_string())),
            Err(e) => return Err(ServerError::Serve(e.to_string())),
        }
        tracing::info!(addr = %running.addr, "server stopped");
        self.events.emit(ServerEvent::ServerStopped);
        Ok(())
    }
}
