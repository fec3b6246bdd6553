use cookie::Cookie;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::{env_flag, get_env_with_prefix};

/// Session cookie configuration
///
/// The `cookie_secure` and `cookie_http_only` flags are normally owned by the
/// security settings and pushed in once when a [`Shield`](crate::Shield) is
/// initialized.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Cookie name
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Cookie domain (optional)
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Cookie path
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,

    /// Cookie secure flag (HTTPS only)
    #[serde(default = "default_secure")]
    pub cookie_secure: bool,

    /// Cookie http_only flag
    #[serde(default = "default_http_only")]
    pub cookie_http_only: bool,

    /// Cookie lifetime (in seconds)
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_domain: None,
            cookie_path: default_cookie_path(),
            cookie_secure: default_secure(),
            cookie_http_only: default_http_only(),
            default_ttl_seconds: default_ttl_seconds(),
        }
    }
}

impl SessionConfig {
    /// Load session configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().merge_env()
    }

    pub fn merge_env(mut self) -> Self {
        if let Some(name) = get_env_with_prefix("SESSION_COOKIE_NAME") {
            self.cookie_name = name;
        }

        if let Some(domain) = get_env_with_prefix("SESSION_COOKIE_DOMAIN") {
            self.cookie_domain = Some(domain);
        }

        if let Some(path) = get_env_with_prefix("SESSION_COOKIE_PATH") {
            self.cookie_path = path;
        }

        if let Some(ttl) = get_env_with_prefix("SESSION_TTL_SECONDS") {
            if let Ok(seconds) = ttl.parse() {
                self.default_ttl_seconds = seconds;
            }
        }

        self.cookie_secure = env_flag("SESSION_COOKIE_SECURE", self.cookie_secure);
        self.cookie_http_only = env_flag("SESSION_COOKIE_HTTP_ONLY", self.cookie_http_only);

        self
    }

    /// Get default TTL as Duration
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// Build a session cookie carrying `value` with the configured attributes
    pub fn build_cookie(&self, value: impl Into<String>) -> Cookie<'static> {
        let max_age = i64::try_from(self.default_ttl_seconds).unwrap_or(i64::MAX);
        let mut builder = Cookie::build((self.cookie_name.clone(), value.into()))
            .path(self.cookie_path.clone())
            .secure(self.cookie_secure)
            .http_only(self.cookie_http_only)
            .max_age(cookie::time::Duration::seconds(max_age));

        if let Some(ref domain) = self.cookie_domain {
            builder = builder.domain(domain.clone());
        }

        builder.build()
    }
}

fn default_cookie_name() -> String {
    "bulwark_session".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

fn default_secure() -> bool {
    true
}

fn default_http_only() -> bool {
    true
}

fn default_ttl_seconds() -> u64 {
    3600 * 24 // 24 hours
}
