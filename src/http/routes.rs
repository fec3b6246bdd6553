use axum::Router;

use crate::security::RouteOverride;

/// Trait for composable route modules
///
/// Implement this trait to create modular, reusable route groups.
/// Each module can register its own routes, and optionally security header
/// overrides for some of them, and be composed into the main application.
///
/// # Example
///
/// ```ignore
/// struct WidgetsModule;
///
/// impl RouteModule for WidgetsModule {
///     fn routes(&self) -> Router {
///         Router::new()
///             .route("/", get(list_widgets))
///             .route("/{id}/embed", get(embed_widget))
///     }
///
///     fn prefix(&self) -> Option<&str> {
///         Some("/widgets")
///     }
///
///     fn overrides(&self) -> Vec<(String, RouteOverride)> {
///         vec![("/{id}/embed".into(), RouteOverride::new().allow_from("*"))]
///     }
/// }
/// ```
pub trait RouteModule {
    /// Returns a router with all routes for this module
    fn routes(&self) -> Router;

    /// Optional: specify a path prefix for all routes in this module
    fn prefix(&self) -> Option<&str> {
        None
    }

    /// Optional: security header overrides, keyed by route template relative to the prefix
    fn overrides(&self) -> Vec<(String, RouteOverride)> {
        Vec::new()
    }
}
