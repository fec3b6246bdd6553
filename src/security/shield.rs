use super::config::SecurityConfig;
use super::headers::{SecurityHeadersLayer, build_security_headers_layer};
use super::overrides::RouteOverrides;
use crate::core::App;

/// Installs a [`SecurityConfig`] into an [`App`]
///
/// Two ways in, mirroring how applications are usually put together:
///
/// ```rust,ignore
/// // Application already exists
/// let mut app = App::new().route("/", get(index));
/// Shield::attach(&mut app, SecurityConfig::default());
///
/// // App factory: build the shield first, bind it later
/// let shield = Shield::new(SecurityConfig::builder().deny_framing().build());
/// fn create_app(shield: &Shield) -> App {
///     let mut app = App::new();
///     shield.init_app(&mut app);
///     app
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Shield {
    config: SecurityConfig,
}

impl Shield {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    /// Create a shield and initialize `app` with it immediately
    pub fn attach(app: &mut App, config: SecurityConfig) -> Self {
        let shield = Self::new(config);
        shield.init_app(app);
        shield
    }

    /// Bind this shield's configuration to `app`
    ///
    /// Pushes the session cookie flags into the app's session configuration
    /// and replaces the app's security settings. Routes registered before or
    /// after this call are both covered; the layer is built when the router
    /// is finalized.
    pub fn init_app(&self, app: &mut App) {
        app.install_security(self.config.clone());
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Build the bare layer for a hand-assembled `axum::Router`
    pub fn layer(&self, overrides: RouteOverrides) -> Option<SecurityHeadersLayer> {
        build_security_headers_layer(&self.config, overrides)
    }
}
