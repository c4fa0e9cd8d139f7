#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Skirmish scenarios without a renderer.
//!
//! Scenarios are loaded from TOML files or from single-line transfer strings,
//! played for a number of initiative rounds, and the resulting transport
//! messages are written out as JSON lines.

pub mod map_transfer;
pub mod scenario;
pub mod session;

pub use scenario::{Scenario, ScenarioError};
pub use session::{RunOptions, Session};
