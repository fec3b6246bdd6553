use std::collections::HashMap;

use super::config::{FeaturePolicy, FrameOptions};

/// Per-route partial override of the framing and policy headers
///
/// Only the fields that were set take effect; everything else falls back to
/// the application-wide [`SecurityConfig`](super::SecurityConfig). HSTS,
/// referrer policy, nosniff and file-save have no per-route form.
///
/// # Example
///
/// ```rust,ignore
/// let app = App::new()
///     .route("/", get(index))
///     .route_with("/embed", get(widget), RouteOverride::new().allow_from("*"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct RouteOverride {
    frame_options: Option<Option<FrameOptions>>,
    frame_options_allow_from: Option<String>,
    feature_policy: Option<FeaturePolicy>,
    content_security_policy: Option<Option<String>>,
}

impl RouteOverride {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the frame-options mode; `None` omits the header on this route
    pub fn frame_options(mut self, options: Option<FrameOptions>) -> Self {
        self.frame_options = Some(options);
        self
    }

    pub fn frame_options_allow_from(mut self, origin: impl Into<String>) -> Self {
        self.frame_options_allow_from = Some(origin.into());
        self
    }

    pub fn deny_framing(self) -> Self {
        self.frame_options(Some(FrameOptions::Deny))
    }

    pub fn same_origin_framing(self) -> Self {
        self.frame_options(Some(FrameOptions::SameOrigin))
    }

    /// `X-Frame-Options: ALLOW-FROM <origin>` on this route
    pub fn allow_from(self, origin: impl Into<String>) -> Self {
        self.frame_options(Some(FrameOptions::AllowFrom))
            .frame_options_allow_from(origin)
    }

    /// Omit X-Frame-Options on this route
    pub fn allow_framing(self) -> Self {
        self.frame_options(None)
    }

    /// Override the feature policy; an empty policy omits the header on this route
    pub fn feature_policy(mut self, policy: impl Into<FeaturePolicy>) -> Self {
        self.feature_policy = Some(policy.into());
        self
    }

    /// Override the content security policy; `None` omits the header on this route
    pub fn content_security_policy(mut self, csp: Option<impl Into<String>>) -> Self {
        self.content_security_policy = Some(csp.map(Into::into));
        self
    }

    pub fn frame_options_override(&self) -> Option<Option<FrameOptions>> {
        self.frame_options
    }

    pub fn frame_options_allow_from_override(&self) -> Option<&str> {
        self.frame_options_allow_from.as_deref()
    }

    pub fn feature_policy_override(&self) -> Option<&FeaturePolicy> {
        self.feature_policy.as_ref()
    }

    pub fn content_security_policy_override(&self) -> Option<Option<&str>> {
        self.content_security_policy.as_ref().map(Option::as_deref)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Route overrides keyed by route template (`/users/{id}`)
///
/// Filled while routes are registered, then frozen behind an `Arc` when the
/// router is built. Lookups use the template axum reports as `MatchedPath`.
#[derive(Debug, Clone, Default)]
pub struct RouteOverrides {
    routes: HashMap<String, RouteOverride>,
}

impl RouteOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an override for a route template, replacing any earlier one
    pub fn insert(&mut self, path: impl Into<String>, route: RouteOverride) {
        let path = path.into();
        if route.is_empty() {
            tracing::debug!(path = %path, "Ignoring empty route override");
            return;
        }
        if self.routes.insert(path.clone(), route).is_some() {
            tracing::warn!(path = %path, "Route override registered twice, keeping the latest");
        }
    }

    pub fn get(&self, path: &str) -> Option<&RouteOverride> {
        self.routes.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Join a module prefix and a route template the way `Router::nest` does
pub(crate) fn join_route(prefix: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if prefix.ends_with('/') {
        format!("{}{}", prefix, path)
    } else if path.is_empty() {
        prefix.to_string()
    } else {
        format!("{}/{}", prefix, path)
    }
}
