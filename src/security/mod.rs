//! Security headers middleware.
//!
//! Adds X-Frame-Options, Referrer-Policy, X-Content-Type-Options, HSTS,
//! Feature-Policy and related headers to HTTP responses, with per-route
//! overrides for the framing and policy headers.

mod config;
mod headers;
mod overrides;
mod policy;
mod shield;

pub use config::{
    DEFAULT_HSTS_MAX_AGE, DEFAULT_REFERRER_POLICY, FeaturePolicy, FrameOptions, SecurityConfig,
    SecurityConfigBuilder,
};
pub use headers::{SecurityHeadersLayer, SecurityHeadersService, build_security_headers_layer};
pub use overrides::{RouteOverride, RouteOverrides};
pub(crate) use overrides::join_route;
pub use policy::{ResolvedPolicy, SecureTransport, request_is_secure};
pub use shield::Shield;
