//! Behavior shared by every binary built on this workspace, currently the tracing setup.

pub mod logging;

// Re-exported so downstream crates log through the same `tracing` version.
pub use tracing;
