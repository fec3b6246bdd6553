use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::utils::{env_flag, get_env_with_prefix};

/// Referrer policy sent when none is configured explicitly
pub const DEFAULT_REFERRER_POLICY: &str = "strict-origin-when-cross-origin";

/// One year, in seconds, as browsers count it for HSTS preload lists
pub const DEFAULT_HSTS_MAX_AGE: u64 = 31_556_926;

/// X-Frame-Options header value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FrameOptions {
    /// SAMEORIGIN - Allow framing from same origin
    #[serde(rename = "SAMEORIGIN")]
    SameOrigin,
    /// DENY - Don't allow framing at all
    #[serde(rename = "DENY")]
    Deny,
    /// ALLOW-FROM - Allow framing from the configured origin
    #[serde(rename = "ALLOW-FROM")]
    AllowFrom,
}

impl FrameOptions {
    /// Parse a frame-options mode, returning `None` for anything unrecognized
    ///
    /// Accepts the header spellings (`SAMEORIGIN`, `DENY`, `ALLOW-FROM`) in any
    /// case, with `_` accepted in place of `-`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().replace('_', "-").as_str() {
            "SAMEORIGIN" | "SAME-ORIGIN" => Some(Self::SameOrigin),
            "DENY" => Some(Self::Deny),
            "ALLOW-FROM" | "ALLOWFROM" => Some(Self::AllowFrom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SameOrigin => "SAMEORIGIN",
            Self::Deny => "DENY",
            Self::AllowFrom => "ALLOW-FROM",
        }
    }
}

/// Feature-Policy header value
///
/// Either a value the caller already serialized, or a map from feature name to
/// allow-list that is rendered as `feature allow-list; feature allow-list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FeaturePolicy {
    Raw(String),
    Directives(BTreeMap<String, String>),
}

impl Default for FeaturePolicy {
    fn default() -> Self {
        Self::Directives(BTreeMap::new())
    }
}

impl FeaturePolicy {
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    /// Add a directive, converting a raw policy into an empty directive map first
    pub fn with(self, feature: impl Into<String>, allow_list: impl Into<String>) -> Self {
        let mut directives = match self {
            Self::Directives(directives) => directives,
            Self::Raw(_) => BTreeMap::new(),
        };
        directives.insert(feature.into(), allow_list.into());
        Self::Directives(directives)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raw(value) => value.trim().is_empty(),
            Self::Directives(directives) => directives.is_empty(),
        }
    }

    /// Render the header value, or `None` when there is nothing to send
    pub fn to_header_string(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        match self {
            Self::Raw(value) => Some(value.clone()),
            Self::Directives(directives) => Some(
                directives
                    .iter()
                    .map(|(feature, allow_list)| format!("{} {}", feature, allow_list))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }
}

impl From<&str> for FeaturePolicy {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_string())
    }
}

impl From<String> for FeaturePolicy {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FeaturePolicy {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Directives(
            iter.into_iter()
                .map(|(feature, allow_list)| (feature.into(), allow_list.into()))
                .collect(),
        )
    }
}

/// Security headers configuration for Bulwark applications
///
/// Every field has a default that is safe to ship; an absent value means the
/// corresponding header is not emitted.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SecurityConfig {
    /// Whether security headers are enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Referrer-Policy header value, `None` to omit
    #[serde(default = "default_referrer_policy")]
    pub referrer_policy: Option<String>,

    /// X-Frame-Options mode, `None` to omit; unrecognized values are dropped
    #[serde(
        default = "default_frame_options",
        deserialize_with = "lenient_frame_options"
    )]
    pub frame_options: Option<FrameOptions>,

    /// Origin used when `frame_options` is `ALLOW-FROM`
    #[serde(default)]
    pub frame_options_allow_from: Option<String>,

    /// Feature-Policy header value, empty to omit
    #[serde(default)]
    pub feature_policy: FeaturePolicy,

    /// Content-Security-Policy header value, sent verbatim
    #[serde(default)]
    pub content_security_policy: Option<String>,

    /// Send Strict-Transport-Security on secure requests
    #[serde(default = "default_true")]
    pub strict_transport_security: bool,

    #[serde(default = "default_hsts_max_age")]
    pub strict_transport_security_max_age: u64,

    #[serde(default = "default_true")]
    pub strict_transport_security_include_subdomains: bool,

    #[serde(default)]
    pub strict_transport_security_preload: bool,

    /// Pushed into the session cookie configuration at initialization
    #[serde(default = "default_true")]
    pub session_cookie_secure: bool,

    /// Pushed into the session cookie configuration at initialization
    #[serde(default = "default_true")]
    pub session_cookie_http_only: bool,

    /// X-Content-Type-Options: nosniff
    #[serde(default = "default_true")]
    pub content_type_nosniff: bool,

    /// X-Download-Options: noopen
    #[serde(default)]
    pub force_file_save: bool,

    /// Redirect insecure requests to https
    #[serde(default)]
    pub force_https: bool,

    /// Use 301 instead of 302 for the https redirect
    #[serde(default)]
    pub force_https_permanent: bool,

    /// X-XSS-Protection: 1; mode=block (deprecated, off by default)
    #[serde(default)]
    pub xss_protection: bool,

    /// Treat `X-Forwarded-Proto: https` as a secure request
    #[serde(default = "default_true")]
    pub trust_forwarded_proto: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            referrer_policy: default_referrer_policy(),
            frame_options: default_frame_options(),
            frame_options_allow_from: None,
            feature_policy: FeaturePolicy::default(),
            content_security_policy: None,
            strict_transport_security: true,
            strict_transport_security_max_age: default_hsts_max_age(),
            strict_transport_security_include_subdomains: true,
            strict_transport_security_preload: false,
            session_cookie_secure: true,
            session_cookie_http_only: true,
            content_type_nosniff: true,
            force_file_save: false,
            force_https: false,
            force_https_permanent: false,
            xss_protection: false,
            trust_forwarded_proto: true,
        }
    }
}

impl SecurityConfig {
    /// Create a new SecurityConfig builder
    pub fn builder() -> SecurityConfigBuilder {
        SecurityConfigBuilder::new()
    }

    /// Load security configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    /// Apply `SECURITY_*` environment variables on top of this configuration
    pub fn merge_env(mut self) -> Self {
        self.enabled = env_flag("SECURITY_ENABLED", self.enabled);

        if let Some(referrer) = get_env_with_prefix("SECURITY_REFERRER_POLICY") {
            self.referrer_policy = match referrer.to_lowercase().as_str() {
                "" | "off" | "disable" | "none" => None,
                _ => Some(referrer),
            };
        }

        if let Some(frame_options) = get_env_with_prefix("SECURITY_FRAME_OPTIONS") {
            self.frame_options = FrameOptions::parse(&frame_options);
            if self.frame_options.is_none() {
                tracing::debug!(value = %frame_options, "X-Frame-Options disabled by environment");
            }
        }

        if let Some(origin) = get_env_with_prefix("SECURITY_FRAME_OPTIONS_ALLOW_FROM") {
            self.frame_options_allow_from = Some(origin);
        }

        if let Some(policy) = get_env_with_prefix("SECURITY_FEATURE_POLICY") {
            self.feature_policy = FeaturePolicy::Raw(policy);
        }

        if let Some(csp) = get_env_with_prefix("SECURITY_CSP") {
            self.content_security_policy = Some(csp);
        }

        self.strict_transport_security = env_flag("SECURITY_HSTS", self.strict_transport_security);

        if let Some(max_age) = get_env_with_prefix("SECURITY_HSTS_MAX_AGE") {
            if let Ok(age) = max_age.parse() {
                self.strict_transport_security_max_age = age;
            }
        }

        self.strict_transport_security_include_subdomains = env_flag(
            "SECURITY_HSTS_INCLUDE_SUBDOMAINS",
            self.strict_transport_security_include_subdomains,
        );
        self.strict_transport_security_preload =
            env_flag("SECURITY_HSTS_PRELOAD", self.strict_transport_security_preload);
        self.session_cookie_secure =
            env_flag("SECURITY_SESSION_COOKIE_SECURE", self.session_cookie_secure);
        self.session_cookie_http_only =
            env_flag("SECURITY_SESSION_COOKIE_HTTP_ONLY", self.session_cookie_http_only);
        self.content_type_nosniff = env_flag("SECURITY_NOSNIFF", self.content_type_nosniff);
        self.force_file_save = env_flag("SECURITY_FORCE_FILE_SAVE", self.force_file_save);
        self.force_https = env_flag("SECURITY_FORCE_HTTPS", self.force_https);
        self.force_https_permanent =
            env_flag("SECURITY_FORCE_HTTPS_PERMANENT", self.force_https_permanent);
        self.xss_protection = env_flag("SECURITY_XSS_PROTECTION", self.xss_protection);
        self.trust_forwarded_proto =
            env_flag("SECURITY_TRUST_FORWARDED_PROTO", self.trust_forwarded_proto);

        self
    }

    /// Strict-Transport-Security value for these settings
    pub fn hsts_header_value(&self) -> String {
        let mut value = format!("max-age={}", self.strict_transport_security_max_age);
        if self.strict_transport_security_include_subdomains {
            value.push_str("; includeSubDomains");
        }
        if self.strict_transport_security_preload {
            value.push_str("; preload");
        }
        value
    }
}

/// Builder for SecurityConfig
#[must_use = "builder does nothing until you call build()"]
pub struct SecurityConfigBuilder {
    config: SecurityConfig,
}

impl SecurityConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SecurityConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn referrer_policy(mut self, policy: Option<impl Into<String>>) -> Self {
        self.config.referrer_policy = policy.map(Into::into);
        self
    }

    pub fn frame_options(mut self, options: Option<FrameOptions>) -> Self {
        self.config.frame_options = options;
        self
    }

    pub fn frame_options_allow_from(mut self, origin: impl Into<String>) -> Self {
        self.config.frame_options_allow_from = Some(origin.into());
        self
    }

    pub fn deny_framing(self) -> Self {
        self.frame_options(Some(FrameOptions::Deny))
    }

    pub fn same_origin_framing(self) -> Self {
        self.frame_options(Some(FrameOptions::SameOrigin))
    }

    /// Allow framing from a single origin (`ALLOW-FROM <origin>`)
    pub fn allow_from(self, origin: impl Into<String>) -> Self {
        self.frame_options(Some(FrameOptions::AllowFrom))
            .frame_options_allow_from(origin)
    }

    /// Omit X-Frame-Options entirely
    pub fn allow_framing(self) -> Self {
        self.frame_options(None)
    }

    pub fn feature_policy(mut self, policy: impl Into<FeaturePolicy>) -> Self {
        self.config.feature_policy = policy.into();
        self
    }

    pub fn content_security_policy(mut self, csp: Option<impl Into<String>>) -> Self {
        self.config.content_security_policy = csp.map(Into::into);
        self
    }

    pub fn strict_transport_security(mut self, enabled: bool) -> Self {
        self.config.strict_transport_security = enabled;
        self
    }

    pub fn hsts_max_age(mut self, seconds: u64) -> Self {
        self.config.strict_transport_security_max_age = seconds;
        self
    }

    pub fn hsts_include_subdomains(mut self, include: bool) -> Self {
        self.config.strict_transport_security_include_subdomains = include;
        self
    }

    pub fn hsts_preload(mut self, preload: bool) -> Self {
        self.config.strict_transport_security_preload = preload;
        self
    }

    pub fn session_cookie_secure(mut self, secure: bool) -> Self {
        self.config.session_cookie_secure = secure;
        self
    }

    pub fn session_cookie_http_only(mut self, http_only: bool) -> Self {
        self.config.session_cookie_http_only = http_only;
        self
    }

    pub fn content_type_nosniff(mut self, enabled: bool) -> Self {
        self.config.content_type_nosniff = enabled;
        self
    }

    pub fn force_file_save(mut self, enabled: bool) -> Self {
        self.config.force_file_save = enabled;
        self
    }

    pub fn force_https(mut self, enabled: bool) -> Self {
        self.config.force_https = enabled;
        self
    }

    pub fn force_https_permanent(mut self, permanent: bool) -> Self {
        self.config.force_https_permanent = permanent;
        self
    }

    pub fn xss_protection(mut self, enabled: bool) -> Self {
        self.config.xss_protection = enabled;
        self
    }

    pub fn trust_forwarded_proto(mut self, trust: bool) -> Self {
        self.config.trust_forwarded_proto = trust;
        self
    }

    pub fn build(self) -> SecurityConfig {
        self.config
    }
}

impl Default for SecurityConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn lenient_frame_options<'de, D>(deserializer: D) -> Result<Option<FrameOptions>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(FrameOptions::parse))
}

fn default_true() -> bool {
    true
}

fn default_referrer_policy() -> Option<String> {
    Some(DEFAULT_REFERRER_POLICY.to_string())
}

fn default_frame_options() -> Option<FrameOptions> {
    Some(FrameOptions::SameOrigin)
}

fn default_hsts_max_age() -> u64 {
    DEFAULT_HSTS_MAX_AGE
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = SecurityConfig::default();
        assert!(config.enabled);
        assert_eq!(config.referrer_policy.as_deref(), Some("strict-origin-when-cross-origin"));
        assert_eq!(config.frame_options, Some(FrameOptions::SameOrigin));
        assert_eq!(config.strict_transport_security_max_age, 31556926);
        assert!(config.strict_transport_security_include_subdomains);
        assert!(!config.strict_transport_security_preload);
        assert!(config.content_type_nosniff);
        assert!(!config.force_file_save);
        assert!(!config.force_https);
        assert!(config.feature_policy.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = SecurityConfig::builder()
            .hsts_max_age(63072000)
            .hsts_preload(true)
            .deny_framing()
            .referrer_policy(None::<String>)
            .force_file_save(true)
            .build();

        assert_eq!(config.strict_transport_security_max_age, 63072000);
        assert!(config.strict_transport_security_preload);
        assert_eq!(config.frame_options, Some(FrameOptions::Deny));
        assert_eq!(config.referrer_policy, None);
        assert!(config.force_file_save);
    }

    #[test]
    fn test_framing_options() {
        let config = SecurityConfig::builder().allow_from("https://example.com").build();
        assert_eq!(config.frame_options, Some(FrameOptions::AllowFrom));
        assert_eq!(config.frame_options_allow_from.as_deref(), Some("https://example.com"));

        let config = SecurityConfig::builder().allow_framing().build();
        assert_eq!(config.frame_options, None);
    }

    #[test]
    fn test_frame_options_parse() {
        assert_eq!(FrameOptions::parse("sameorigin"), Some(FrameOptions::SameOrigin));
        assert_eq!(FrameOptions::parse("DENY"), Some(FrameOptions::Deny));
        assert_eq!(FrameOptions::parse("allow_from"), Some(FrameOptions::AllowFrom));
        assert_eq!(FrameOptions::parse("ALLOWALL"), None);
        assert_eq!(FrameOptions::parse(""), None);
    }

    #[test]
    fn test_hsts_header_value() {
        let config = SecurityConfig::default();
        assert_eq!(config.hsts_header_value(), "max-age=31556926; includeSubDomains");

        let config = SecurityConfig::builder()
            .hsts_max_age(600)
            .hsts_include_subdomains(false)
            .hsts_preload(true)
            .build();
        assert_eq!(config.hsts_header_value(), "max-age=600; preload");
    }

    #[test]
    fn test_feature_policy_rendering() {
        let policy = FeaturePolicy::default()
            .with("geolocation", "'self'")
            .with("camera", "'none'");
        assert_eq!(
            policy.to_header_string().as_deref(),
            Some("camera 'none'; geolocation 'self'")
        );

        let raw = FeaturePolicy::from("microphone 'none'");
        assert_eq!(raw.to_header_string().as_deref(), Some("microphone 'none'"));

        assert_eq!(FeaturePolicy::raw("  ").to_header_string(), None);
        assert_eq!(FeaturePolicy::default().to_header_string(), None);
    }

    #[test]
    fn test_deserialize_unknown_frame_options_is_dropped() {
        let config: SecurityConfig = toml::from_str(
            r#"
            frame_options = "ALLOWALL"
            feature_policy = { camera = "'none'" }
            "#,
        )
        .unwrap();
        assert_eq!(config.frame_options, None);
        assert_eq!(config.feature_policy.to_header_string().as_deref(), Some("camera 'none'"));
        assert!(config.strict_transport_security);
    }

    #[test]
    fn test_deserialize_missing_fields_use_defaults() {
        let config: SecurityConfig = toml::from_str("").unwrap();
        assert_eq!(config, SecurityConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        unsafe {
            std::env::set_var("BULWARK_SECURITY_FRAME_OPTIONS", "allow-from");
            std::env::set_var("BULWARK_SECURITY_FRAME_OPTIONS_ALLOW_FROM", "https://example.com");
            std::env::set_var("BULWARK_SECURITY_REFERRER_POLICY", "off");
            std::env::set_var("BULWARK_SECURITY_HSTS_MAX_AGE", "300");
            std::env::set_var("BULWARK_SECURITY_FORCE_FILE_SAVE", "true");
        }

        let config = SecurityConfig::from_env();
        assert_eq!(config.frame_options, Some(FrameOptions::AllowFrom));
        assert_eq!(config.frame_options_allow_from.as_deref(), Some("https://example.com"));
        assert_eq!(config.referrer_policy, None);
        assert_eq!(config.strict_transport_security_max_age, 300);
        assert!(config.force_file_save);

        unsafe {
            std::env::set_var("BULWARK_SECURITY_FRAME_OPTIONS", "bogus");
        }
        assert_eq!(SecurityConfig::from_env().frame_options, None);

        unsafe {
            std::env::remove_var("BULWARK_SECURITY_FRAME_OPTIONS");
            std::env::remove_var("BULWARK_SECURITY_FRAME_OPTIONS_ALLOW_FROM");
            std::env::remove_var("BULWARK_SECURITY_REFERRER_POLICY");
            std::env::remove_var("BULWARK_SECURITY_HSTS_MAX_AGE");
            std::env::remove_var("BULWARK_SECURITY_FORCE_FILE_SAVE");
        }
    }
}
