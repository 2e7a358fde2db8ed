//! Kariba CLI Library
//!
//! Command-line tooling around the Lake Kariba wind analysis project:
//! configuration inspection, project scaffolding, the analysis launcher and
//! GitHub repository automation.

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

/// Git and GitHub automation.
pub mod git;

/// Stderr and session-file tracing setup.
pub mod logging;

/// Virtual environment checks and the analysis process launcher.
pub mod launcher;

/// Interactive confirmation and text prompts.
pub mod prompt;

/// Project directory layout for `init`.
pub mod scaffold;
