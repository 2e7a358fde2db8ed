//! Kariba Core Library
//!
//! Configuration model shared by the Lake Kariba wind analysis tooling:
//! layered settings resolution, path resolution and output directory
//! provisioning.

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::{
    default_project_root, ConfigFormat, ConfigResolver, LoadOutcome, ProvisionReport,
    ResolvedPathSet, ResolverOptions,
};
pub use error::*;
