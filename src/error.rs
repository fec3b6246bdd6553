use std::path::PathBuf;

/// The main error type for Bulwark applications
///
/// The header policy itself never fails: invalid values are skipped and
/// logged. Errors only come from loading configuration and running the server.
#[derive(Debug, thiserror::Error)]
pub enum BulwarkError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to read config file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BulwarkError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias for Bulwark operations
pub type Result<T> = std::result::Result<T, BulwarkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = BulwarkError::config("port must be greater than 0");
        assert_eq!(err.to_string(), "Invalid configuration: port must be greater than 0");
    }

    #[test]
    fn test_config_file_error_keeps_source() {
        let err = BulwarkError::ConfigFile {
            path: PathBuf::from("/etc/bulwark.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/etc/bulwark.toml"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
