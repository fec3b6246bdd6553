//! Session cookie configuration.
//!
//! Holds the cookie attributes the security settings adjust at startup.

mod config;

pub use config::SessionConfig;
