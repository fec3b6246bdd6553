use crate::{
    config::Config,
    error::{BulwarkError, Result},
    http::RouteModule,
    middleware::MakeRequestUuid,
    security::{RouteOverride, RouteOverrides, SecurityConfig, Shield, build_security_headers_layer, join_route},
    session::SessionConfig,
};
use axum::{Router, routing::MethodRouter};
use std::time::Duration;
use tokio::signal;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Main application structure for Bulwark
///
/// Owns the router, the configuration and the per-route security overrides.
/// The security layer is built from all of them when the app is turned into
/// a router, so overrides registered at any point are picked up.
pub struct App {
    router: Router,
    config: Config,
    route_overrides: RouteOverrides,
    security_initialized: bool,
}

impl App {
    /// Creates a new App with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new App with the provided configuration
    ///
    /// When `config.security` is enabled its headers are applied and its
    /// session cookie flags are pushed into `config.session`.
    pub fn with_config(config: Config) -> Self {
        let mut app = Self {
            router: Router::new(),
            config,
            route_overrides: RouteOverrides::new(),
            security_initialized: false,
        };
        if app.config.security.enabled {
            app.push_session_flags();
        }
        app
    }

    /// Builder pattern for constructing an App
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Register a single route
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Register a route together with its security header overrides
    ///
    /// ```rust,ignore
    /// let app = App::new()
    ///     .route("/", get(home))
    ///     .route_with("/embed", get(embed), RouteOverride::new().allow_from("*"));
    /// ```
    pub fn route_with(mut self, path: &str, method_router: MethodRouter, route: RouteOverride) -> Self {
        self.route_overrides.insert(path, route);
        self.route(path, method_router)
    }

    /// Register a route module with the application
    pub fn register_module<M: RouteModule>(self, module: M) -> Self {
        let prefix = module.prefix().map(str::to_owned);
        let overrides = module.overrides();
        self.mount(module.routes(), prefix, overrides)
    }

    fn mount(
        mut self,
        routes: Router,
        prefix: Option<String>,
        overrides: Vec<(String, RouteOverride)>,
    ) -> Self {
        for (path, route) in overrides {
            let path = match prefix {
                Some(ref prefix) => join_route(prefix, &path),
                None => path,
            };
            self.route_overrides.insert(path, route);
        }

        self.router = match prefix {
            Some(ref prefix) => self.router.nest(prefix, routes),
            None => self.router.merge(routes),
        };
        self
    }

    /// Merge a router without security overrides into the application
    pub fn merge_router(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Apply a layer to the routes registered so far
    ///
    /// Example: `app.layer(axum::Extension(db_pool))`
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: tower::Layer<axum::routing::Route> + Clone + Send + Sync + 'static,
        L::Service: tower::Service<axum::http::Request<axum::body::Body>, Error = std::convert::Infallible> + Clone + Send + Sync + 'static,
        <L::Service as tower::Service<axum::http::Request<axum::body::Body>>>::Response: axum::response::IntoResponse + 'static,
        <L::Service as tower::Service<axum::http::Request<axum::body::Body>>>::Future: Send + 'static,
    {
        self.router = self.router.layer(layer);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.config.session
    }

    pub fn route_overrides(&self) -> &RouteOverrides {
        &self.route_overrides
    }

    /// Replace the security settings and push the session cookie flags
    pub(crate) fn install_security(&mut self, security: SecurityConfig) {
        if self.security_initialized {
            tracing::warn!("Security already initialized for this app, replacing configuration");
        }

        self.config.security = security;
        self.push_session_flags();
        self.security_initialized = true;

        let security = &self.config.security;
        tracing::info!(
            enabled = security.enabled,
            session_cookie_secure = security.session_cookie_secure,
            session_cookie_http_only = security.session_cookie_http_only,
            "Security headers initialized"
        );
    }

    fn push_session_flags(&mut self) {
        self.config.session.cookie_secure = self.config.security.session_cookie_secure;
        self.config.session.cookie_http_only = self.config.security.session_cookie_http_only;
    }

    /// Finalize the router with the security and request tracing middleware
    ///
    /// Also the entry point for tests: the returned router can be driven with
    /// `tower::ServiceExt::oneshot` or the [`testing`](crate::testing) helpers.
    pub fn into_router(self) -> Router {
        let mut router = self.router;

        // Security headers - innermost so the matched route is known
        if let Some(security_layer) =
            build_security_headers_layer(&self.config.security, self.route_overrides)
        {
            router = router.layer(security_layer);
        }

        // Request ID - generate outside, echo on the response
        router = router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        // HTTP tracing
        router.layer(TraceLayer::new_for_http())
    }

    /// Start the application server
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.server.addr().map_err(|e| {
            BulwarkError::config(format!("Invalid server address in config: {}", e))
        })?;

        let router = self.into_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        tracing::info!("Server starting on http://{}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

enum Registration {
    Route {
        path: String,
        method_router: MethodRouter,
        route: Option<RouteOverride>,
    },
    Module {
        routes: Router,
        prefix: Option<String>,
        overrides: Vec<(String, RouteOverride)>,
    },
}

/// Builder for App with fluent API
#[must_use = "builder does nothing until you call build()"]
pub struct AppBuilder {
    config: Config,
    security: Option<SecurityConfig>,
    registrations: Vec<Registration>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            security: None,
            registrations: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Initialize the app with these security settings through a [`Shield`]
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = Some(security);
        self
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.registrations.push(Registration::Route {
            path: path.to_string(),
            method_router,
            route: None,
        });
        self
    }

    pub fn route_with(mut self, path: &str, method_router: MethodRouter, route: RouteOverride) -> Self {
        self.registrations.push(Registration::Route {
            path: path.to_string(),
            method_router,
            route: Some(route),
        });
        self
    }

    pub fn register_module<M: RouteModule>(mut self, module: M) -> Self {
        self.registrations.push(Registration::Module {
            routes: module.routes(),
            prefix: module.prefix().map(str::to_owned),
            overrides: module.overrides(),
        });
        self
    }

    pub fn build(self) -> App {
        let mut app = App::with_config(self.config);

        if let Some(security) = self.security {
            Shield::new(security).init_app(&mut app);
        }

        for registration in self.registrations {
            app = match registration {
                Registration::Route {
                    path,
                    method_router,
                    route: Some(route),
                } => app.route_with(&path, method_router, route),
                Registration::Route {
                    path,
                    method_router,
                    route: None,
                } => app.route(&path, method_router),
                Registration::Module {
                    routes,
                    prefix,
                    overrides,
                } => app.mount(routes, prefix, overrides),
            };
        }

        app
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install terminate signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // Give connections a grace period to close
    tokio::time::sleep(Duration::from_secs(1)).await;
    tracing::info!("Shutdown complete");
}
