//! Route composition.
//!
//! Provides the RouteModule trait for organizing routes and their
//! security header overrides.

pub mod routes;

pub use routes::RouteModule;
