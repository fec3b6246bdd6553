/// Get environment variable with BULWARK_ prefix, falling back to unprefixed version
///
/// This helper function checks for `BULWARK_{key}` first, then falls back to `{key}`
/// for compatibility with standard environment variable naming.
///
/// # Examples
///
/// ```rust,ignore
/// // Checks BULWARK_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("BULWARK_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Read a boolean flag from the environment, keeping `current` when unset or unparseable
pub fn env_flag(key: &str, current: bool) -> bool {
    match get_env_with_prefix(key) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                tracing::warn!(key, value = other, "Ignoring unparseable boolean environment value");
                current
            }
        },
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_env_with_prefix() {
        unsafe {
            std::env::set_var("BULWARK_TEST_VAR", "prefixed_value");
        }
        assert_eq!(get_env_with_prefix("TEST_VAR"), Some("prefixed_value".to_string()));
        unsafe {
            std::env::remove_var("BULWARK_TEST_VAR");
        }

        unsafe {
            std::env::set_var("FALLBACK_VAR", "unprefixed_value");
        }
        assert_eq!(get_env_with_prefix("FALLBACK_VAR"), Some("unprefixed_value".to_string()));
        unsafe {
            std::env::remove_var("FALLBACK_VAR");
        }

        assert_eq!(get_env_with_prefix("NON_EXISTENT_VAR"), None);
    }

    #[test]
    #[serial]
    fn test_env_flag() {
        unsafe {
            std::env::set_var("BULWARK_FLAG_VAR", "off");
        }
        assert!(!env_flag("FLAG_VAR", true));

        unsafe {
            std::env::set_var("BULWARK_FLAG_VAR", "Yes");
        }
        assert!(env_flag("FLAG_VAR", false));

        unsafe {
            std::env::set_var("BULWARK_FLAG_VAR", "maybe");
        }
        assert!(env_flag("FLAG_VAR", true));
        assert!(!env_flag("FLAG_VAR", false));

        unsafe {
            std::env::remove_var("BULWARK_FLAG_VAR");
        }
        assert!(env_flag("FLAG_VAR", true));
    }
}
