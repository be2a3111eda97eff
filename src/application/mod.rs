//! Application subsystem.
//!
//! # Data Flow
//! ```text
//! App::use_* / App::from_config (ordered registration)
//!     → App::callback (compose once → AppService)
//!     → service.rs (per request: create_context, spawn dispatch, await response)
//!     → dispatch.rs (status 404 → pipeline + finalizer → reporter)
//!     → App::serve (axum::serve + tower-http layers, graceful shutdown)
//! ```
//!
//! # Design Decisions
//! - Registration is only possible before `callback`; the composed pipeline is immutable
//! - Unknown middleware names fail at build time, never at request time
//! - Each request's pipeline runs on its own task with no shared mutable state

pub mod dispatch;
pub mod service;

pub use dispatch::handle_request;
pub use service::{build_router, AppService};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, ToSocketAddrs};

use crate::config::{AppConfig, ConfigError, ListenerConfig};
use crate::context::{AppDefaults, Context};
use crate::error::Result;
use crate::lifecycle::{shutdown_signal, Shutdown};
use crate::middleware::{from_fn, BoxFuture, Middleware, Next, Pipeline, Registry, SharedMiddleware};
use crate::observability::{ErrorReporter, ReportSink};

/// A middleware application.
///
/// ```ignore
/// let mut app = App::new();
/// app.use_fn(|ctx, next| Box::pin(async move {
///     ctx.set_body("hello");
///     next.run(ctx).await
/// }));
/// app.listen("127.0.0.1:3000").await?;
/// ```
#[derive(Default)]
pub struct App {
    defaults: AppDefaults,
    middleware: Vec<SharedMiddleware>,
    registry: Registry,
    listener: ListenerConfig,
    request_scope: bool,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an app from config, resolving the middleware stack against the
    /// built-in registry.
    pub fn from_config(config: &AppConfig) -> std::result::Result<Self, ConfigError> {
        Self::from_config_with_registry(config, Registry::default())
    }

    /// Build an app from config, resolving names against `registry`.
    pub fn from_config_with_registry(
        config: &AppConfig,
        registry: Registry,
    ) -> std::result::Result<Self, ConfigError> {
        let mut app = Self {
            defaults: AppDefaults::from(&config.app),
            middleware: Vec::new(),
            registry,
            listener: config.listener.clone(),
            request_scope: config.app.request_scope,
        };
        for name in &config.middleware.stack {
            app.use_named(name)?;
        }
        tracing::debug!(stack = ?config.middleware.stack, "Middleware stack registered");
        Ok(app)
    }

    /// Route unhandled failures to `sink` instead of the log.
    pub fn with_reporter(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.defaults.reporter = ErrorReporter::new(sink);
        self
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_listener(mut self, listener: ListenerConfig) -> Self {
        self.listener = listener;
        self
    }

    /// Expose the current request through `context::scope::current`.
    pub fn request_scope(mut self, enabled: bool) -> Self {
        self.request_scope = enabled;
        self
    }

    pub fn defaults(&self) -> &AppDefaults {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut AppDefaults {
        &mut self.defaults
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Append a middleware. Registration order is execution order.
    pub fn use_middleware<M: Middleware>(&mut self, middleware: M) -> &mut Self {
        self.use_shared(Arc::new(middleware))
    }

    /// Append an already shared middleware.
    pub fn use_shared(&mut self, middleware: SharedMiddleware) -> &mut Self {
        tracing::trace!(middleware = middleware.name(), "Registering middleware");
        self.middleware.push(middleware);
        self
    }

    /// Append a closure middleware.
    pub fn use_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context, Next<'a>) -> BoxFuture<'a, Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.use_middleware(from_fn(f))
    }

    /// Append the middleware registered under `name`.
    pub fn use_named(&mut self, name: &str) -> std::result::Result<&mut Self, ConfigError> {
        let middleware = self.registry.resolve(name)?;
        Ok(self.use_shared(middleware))
    }

    /// Names of the registered middleware, in order.
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Compose the registered middleware into the request callback.
    pub fn callback(&self) -> AppService {
        AppService::new(
            Pipeline::compose(self.middleware.iter().cloned()),
            Arc::new(self.defaults.clone()),
            self.request_scope,
        )
    }

    /// Serve on `listener` until `shutdown` triggers, then drain in-flight requests.
    pub async fn serve(&self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        let router = build_router(self.callback(), &self.listener);

        tracing::info!(
            address = %addr,
            env = %self.defaults.env,
            middleware = ?self.middleware_names(),
            "HTTP server starting"
        );

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Bind `addr` and serve until Ctrl+C or SIGTERM.
    pub async fn listen<A: ToSocketAddrs>(&self, addr: A) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        let shutdown = Shutdown::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            trigger.trigger();
        });
        self.serve(listener, shutdown).await
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("env", &self.defaults.env)
            .field("middleware", &self.middleware_names())
            .field("request_scope", &self.request_scope)
            .finish_non_exhaustive()
    }
}
