use axum::http::{HeaderName, HeaderValue, Request, header, uri::Scheme};

use super::config::{FeaturePolicy, FrameOptions, SecurityConfig};
use super::overrides::RouteOverride;

pub(crate) const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Request extension marking a connection that arrived over TLS
///
/// Insert it from the TLS acceptor (or any layer that knows the transport)
/// so HSTS is sent without relying on `X-Forwarded-Proto`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecureTransport;

/// Whether the request came in over https, directly or via a trusted proxy
pub fn request_is_secure<B>(request: &Request<B>, trust_forwarded_proto: bool) -> bool {
    if request.uri().scheme() == Some(&Scheme::HTTPS)
        || request.extensions().get::<SecureTransport>().is_some()
    {
        return true;
    }

    trust_forwarded_proto
        && request
            .headers()
            .get(X_FORWARDED_PROTO)
            .map(|proto| proto.as_bytes() == b"https")
            .unwrap_or(false)
}

/// Global settings merged with the override for the matched route
#[derive(Debug, Clone)]
pub struct ResolvedPolicy<'a> {
    config: &'a SecurityConfig,
    frame_options: Option<FrameOptions>,
    frame_options_allow_from: Option<&'a str>,
    feature_policy: &'a FeaturePolicy,
    content_security_policy: Option<&'a str>,
}

impl<'a> ResolvedPolicy<'a> {
    pub fn resolve(config: &'a SecurityConfig, route: Option<&'a RouteOverride>) -> Self {
        let frame_options = route
            .and_then(RouteOverride::frame_options_override)
            .unwrap_or(config.frame_options);
        let frame_options_allow_from = route
            .and_then(RouteOverride::frame_options_allow_from_override)
            .or(config.frame_options_allow_from.as_deref());
        let feature_policy = route
            .and_then(RouteOverride::feature_policy_override)
            .unwrap_or(&config.feature_policy);
        let content_security_policy = route
            .and_then(RouteOverride::content_security_policy_override)
            .unwrap_or(config.content_security_policy.as_deref());

        Self {
            config,
            frame_options,
            frame_options_allow_from,
            feature_policy,
            content_security_policy,
        }
    }

    /// X-Frame-Options value after the override merge
    ///
    /// `ALLOW-FROM` without an origin still produces `"ALLOW-FROM "`.
    pub fn frame_options_value(&self) -> Option<String> {
        match self.frame_options? {
            FrameOptions::AllowFrom => Some(format!(
                "{} {}",
                FrameOptions::AllowFrom.as_str(),
                self.frame_options_allow_from.unwrap_or_default()
            )),
            options => Some(options.as_str().to_string()),
        }
    }

    /// Ordered header assignments for a request with the given transport security
    pub fn headers(&self, secure: bool) -> Vec<(HeaderName, HeaderValue)> {
        let mut headers = Vec::with_capacity(8);

        if self.config.xss_protection {
            headers.push((
                header::X_XSS_PROTECTION,
                HeaderValue::from_static("1; mode=block"),
            ));
        }

        if self.config.force_file_save {
            headers.push((
                HeaderName::from_static("x-download-options"),
                HeaderValue::from_static("noopen"),
            ));
        }

        if let Some(ref referrer) = self.config.referrer_policy {
            push_value(&mut headers, header::REFERRER_POLICY, referrer);
        }

        if self.config.content_type_nosniff {
            headers.push((
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ));
        }

        if let Some(frame_options) = self.frame_options_value() {
            push_value(&mut headers, header::X_FRAME_OPTIONS, &frame_options);
        }

        if let Some(feature_policy) = self.feature_policy.to_header_string() {
            push_value(
                &mut headers,
                HeaderName::from_static("feature-policy"),
                &feature_policy,
            );
        }

        if let Some(csp) = self.content_security_policy {
            push_value(&mut headers, header::CONTENT_SECURITY_POLICY, csp);
        }

        if self.config.strict_transport_security && secure {
            push_value(
                &mut headers,
                header::STRICT_TRANSPORT_SECURITY,
                &self.config.hsts_header_value(),
            );
        }

        headers
    }
}

fn push_value(headers: &mut Vec<(HeaderName, HeaderValue)>, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => headers.push((name, value)),
        Err(_) => tracing::warn!(header = %name, "Skipping security header with invalid value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn names(headers: &[(HeaderName, HeaderValue)]) -> Vec<&str> {
        headers.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn value<'h>(headers: &'h [(HeaderName, HeaderValue)], name: &str) -> Option<&'h str> {
        headers
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .and_then(|(_, v)| v.to_str().ok())
    }

    #[test]
    fn test_default_headers_insecure_request() {
        let config = SecurityConfig::default();
        let headers = ResolvedPolicy::resolve(&config, None).headers(false);
        assert_eq!(
            names(&headers),
            vec!["referrer-policy", "x-content-type-options", "x-frame-options"]
        );
        assert_eq!(value(&headers, "x-frame-options"), Some("SAMEORIGIN"));
    }

    #[test]
    fn test_full_wire_order() {
        let config = SecurityConfig::builder()
            .xss_protection(true)
            .force_file_save(true)
            .deny_framing()
            .feature_policy(FeaturePolicy::default().with("camera", "'none'"))
            .content_security_policy(Some("default-src 'self'"))
            .build();
        let headers = ResolvedPolicy::resolve(&config, None).headers(true);
        assert_eq!(
            names(&headers),
            vec![
                "x-xss-protection",
                "x-download-options",
                "referrer-policy",
                "x-content-type-options",
                "x-frame-options",
                "feature-policy",
                "content-security-policy",
                "strict-transport-security",
            ]
        );
        assert_eq!(value(&headers, "x-xss-protection"), Some("1; mode=block"));
        assert_eq!(value(&headers, "x-download-options"), Some("noopen"));
    }

    #[test]
    fn test_frame_options_literals() {
        for (options, expected) in [
            (FrameOptions::SameOrigin, "SAMEORIGIN"),
            (FrameOptions::Deny, "DENY"),
        ] {
            let config = SecurityConfig::builder()
                .frame_options(Some(options))
                .frame_options_allow_from("https://ignored.example")
                .build();
            let policy = ResolvedPolicy::resolve(&config, None);
            assert_eq!(policy.frame_options_value().as_deref(), Some(expected));
        }
    }

    #[test]
    fn test_allow_from() {
        let config = SecurityConfig::builder().allow_from("https://example.com").build();
        let policy = ResolvedPolicy::resolve(&config, None);
        assert_eq!(
            policy.frame_options_value().as_deref(),
            Some("ALLOW-FROM https://example.com")
        );
    }

    #[test]
    fn test_allow_from_without_origin_keeps_empty_origin() {
        let config = SecurityConfig::builder()
            .frame_options(Some(FrameOptions::AllowFrom))
            .build();
        let policy = ResolvedPolicy::resolve(&config, None);
        assert_eq!(policy.frame_options_value().as_deref(), Some("ALLOW-FROM "));
        assert_eq!(value(&policy.headers(false), "x-frame-options"), Some("ALLOW-FROM "));
    }

    #[test]
    fn test_hsts_only_on_secure_requests() {
        let config = SecurityConfig::builder()
            .hsts_max_age(31556926)
            .hsts_include_subdomains(true)
            .hsts_preload(false)
            .build();
        let policy = ResolvedPolicy::resolve(&config, None);

        assert_eq!(value(&policy.headers(false), "strict-transport-security"), None);
        assert_eq!(
            value(&policy.headers(true), "strict-transport-security"),
            Some("max-age=31556926; includeSubDomains")
        );
    }

    #[test]
    fn test_hsts_disabled() {
        let config = SecurityConfig::builder().strict_transport_security(false).build();
        let policy = ResolvedPolicy::resolve(&config, None);
        assert_eq!(value(&policy.headers(true), "strict-transport-security"), None);
        assert_eq!(value(&policy.headers(false), "strict-transport-security"), None);
    }

    #[test]
    fn test_route_override_merge() {
        let config = SecurityConfig::builder()
            .deny_framing()
            .feature_policy("geolocation 'none'")
            .build();
        let route = RouteOverride::new().allow_from("*");
        let policy = ResolvedPolicy::resolve(&config, Some(&route));

        assert_eq!(policy.frame_options_value().as_deref(), Some("ALLOW-FROM *"));
        assert_eq!(
            value(&policy.headers(false), "feature-policy"),
            Some("geolocation 'none'")
        );
    }

    #[test]
    fn test_route_override_origin_only() {
        let config = SecurityConfig::builder()
            .allow_from("https://global.example")
            .build();
        let route = RouteOverride::new().frame_options_allow_from("https://route.example");
        let policy = ResolvedPolicy::resolve(&config, Some(&route));
        assert_eq!(
            policy.frame_options_value().as_deref(),
            Some("ALLOW-FROM https://route.example")
        );
    }

    #[test]
    fn test_route_override_can_remove_headers() {
        let config = SecurityConfig::builder()
            .feature_policy("camera 'none'")
            .content_security_policy(Some("default-src 'self'"))
            .build();
        let route = RouteOverride::new()
            .allow_framing()
            .feature_policy(FeaturePolicy::default())
            .content_security_policy(None::<String>);
        let headers = ResolvedPolicy::resolve(&config, Some(&route)).headers(false);

        assert_eq!(value(&headers, "x-frame-options"), None);
        assert_eq!(value(&headers, "feature-policy"), None);
        assert_eq!(value(&headers, "content-security-policy"), None);
        assert_eq!(
            value(&headers, "referrer-policy"),
            Some("strict-origin-when-cross-origin")
        );
    }

    #[test]
    fn test_invalid_value_is_skipped() {
        let config = SecurityConfig::builder()
            .referrer_policy(Some("no-referrer\nX-Injected: 1"))
            .build();
        let headers = ResolvedPolicy::resolve(&config, None).headers(false);
        assert_eq!(value(&headers, "referrer-policy"), None);
        assert_eq!(value(&headers, "x-content-type-options"), Some("nosniff"));
    }

    #[test]
    fn test_request_is_secure() {
        let plain = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert!(!request_is_secure(&plain, true));

        let absolute = Request::builder()
            .uri("https://example.com/")
            .body(Body::empty())
            .unwrap();
        assert!(request_is_secure(&absolute, false));

        let mut tls = Request::builder().uri("/").body(Body::empty()).unwrap();
        tls.extensions_mut().insert(SecureTransport);
        assert!(request_is_secure(&tls, false));

        let proxied = Request::builder()
            .uri("/")
            .header("X-Forwarded-Proto", "https")
            .body(Body::empty())
            .unwrap();
        assert!(request_is_secure(&proxied, true));
        assert!(!request_is_secure(&proxied, false));

        let proxied_http = Request::builder()
            .uri("/")
            .header("X-Forwarded-Proto", "http")
            .body(Body::empty())
            .unwrap();
        assert!(!request_is_secure(&proxied_http, true));
    }
}
