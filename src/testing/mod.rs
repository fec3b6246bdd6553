//! Testing utilities for Bulwark applications
//!
//! Alba-style HTTP endpoint testing without running a server, with helpers
//! for marking requests as secure so header policies can be asserted.

mod scenario;

pub use scenario::{Scenario, ScenarioAssert, get, post};
