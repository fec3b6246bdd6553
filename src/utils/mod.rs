//! Utility functions and helpers.
//!
//! Environment variable handling shared by the configuration loaders.

pub mod env;

pub use env::{env_flag, get_env_with_prefix};
