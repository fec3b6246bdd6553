//! Bulwark - security response headers for axum applications
//!
//! Bulwark adds a fixed set of HTTP security headers to every response
//! (X-Frame-Options, Referrer-Policy, X-Content-Type-Options,
//! Strict-Transport-Security, Feature-Policy, and optionally
//! Content-Security-Policy, X-Download-Options and X-XSS-Protection),
//! tightens the session cookie flags, and lets individual routes override
//! the framing and policy headers.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::routing::get;
//! use bulwark::{App, ConfigBuilder, RouteOverride, Shield};
//!
//! #[tokio::main]
//! async fn main() -> bulwark::Result<()> {
//!     bulwark::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!
//!     let mut app = App::with_config(config)
//!         .route("/", get(|| async { "Hello" }))
//!         .route_with(
//!             "/embed",
//!             get(|| async { "widget" }),
//!             RouteOverride::new().allow_from("https://partner.example"),
//!         );
//!
//!     let security = app.config().security.clone();
//!     Shield::attach(&mut app, security);
//!
//!     app.serve().await
//! }
//! ```

mod config;
mod core;
mod error;
pub mod http;
mod middleware;
pub mod security;
pub mod session;
pub mod testing;
mod utils;

// Re-exports for public API
pub use crate::core::{App, AppBuilder};
pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig};
pub use error::{BulwarkError, Result};
pub use http::RouteModule;
pub use security::{
    FeaturePolicy, FrameOptions, RouteOverride, RouteOverrides, SecureTransport, SecurityConfig,
    SecurityConfigBuilder, Shield,
};
pub use session::SessionConfig;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main()
/// before creating the App.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "bulwark=debug")
/// - `BULWARK_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("BULWARK_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
