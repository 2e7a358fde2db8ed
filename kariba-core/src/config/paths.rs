//! Default location resolution for the project root and configuration file
//!
//! Every hardcoded location is a fallback only: an explicit flag or one of the
//! environment variables below always wins.

use std::path::{Path, PathBuf};

/// Environment variable naming the project root directory.
pub const PROJECT_ROOT_ENV: &str = "KARIBA_PROJECT_ROOT";

/// Environment variable naming the configuration file.
pub const CONFIG_FILE_ENV: &str = "KARIBA_CONFIG";

/// Environment variable overriding the launcher's virtual environment.
pub const VENV_ENV: &str = "KARIBA_VENV";

/// Configuration file locations probed, in order, relative to the project root.
pub const CANDIDATE_CONFIG_FILES: [&str; 4] = [
    "config/kariba_config.json",
    "config/kariba_config.yaml",
    "config/kariba_config.yml",
    "scripts/config.json",
];

/// Returns the project root.
///
/// Resolution order:
/// - `KARIBA_PROJECT_ROOT` when set and non-empty
/// - `~/deployed/charara`
/// - `.` when no home directory is known
pub fn default_project_root() -> PathBuf {
    match std::env::var(PROJECT_ROOT_ENV) {
        Ok(root) if !root.trim().is_empty() => PathBuf::from(root),
        _ => dirs::home_dir()
            .map(|home| home.join("deployed").join("charara"))
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

/// Returns the configuration file named by `KARIBA_CONFIG`, if any.
pub fn config_file_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_FILE_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

/// Returns the default virtual environment directory (`~/deployed/deployed_env`).
pub fn default_venv_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("deployed").join("deployed_env"))
        .unwrap_or_else(|| PathBuf::from("venv"))
}

/// Probes the candidate locations under `root`.
///
/// Returns the first existing candidate, or the first candidate when none
/// exists (the caller is expected to create it).
pub fn probe_config_file(root: &Path) -> PathBuf {
    CANDIDATE_CONFIG_FILES
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file())
        .unwrap_or_else(|| root.join(CANDIDATE_CONFIG_FILES[0]))
}

/// Joins `path` onto `base` unless it is already absolute.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
