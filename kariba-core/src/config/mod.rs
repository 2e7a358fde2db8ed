//! Configuration for the Kariba wind analysis project
//!
//! # Architecture
//!
//! - [`ConfigResolver`] - loads, merges, resolves and provisions; the single
//!   entry point used by the CLI
//! - [`ConfigFormat`] - JSON or YAML, selected from the file extension
//! - [`ResolvedPathSet`] - absolute form of every entry under `paths`
//! - [`overlay`] / [`lookup`] - one-level merge and dotted-key walk on the raw tree
//!
//! The JSON layout produced by [`default_tree`] is the canonical schema. YAML
//! files use the same keys; extra sections pass through untouched.

mod defaults;
mod format;
mod paths;
mod resolved;
mod resolver;
mod tree;

pub use defaults::{default_tree, DEFAULT_GITHUB_USER, DEFAULT_REPOSITORY};
pub use format::ConfigFormat;
pub use paths::{
    absolutize, config_file_from_env, default_project_root, default_venv_dir,
    probe_config_file, CANDIDATE_CONFIG_FILES, CONFIG_FILE_ENV, PROJECT_ROOT_ENV, VENV_ENV,
};
pub use resolved::{provision, ProvisionReport, ResolvedPathSet};
pub use resolver::{ConfigResolver, LoadOutcome, ResolverOptions};
pub use tree::{assign, lookup, overlay};
