//! Absolute form of every path-shaped configuration entry, and the
//! directories derived from it

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::paths::absolutize;

/// Logical names (relative to `paths`) that name directories to provision,
/// besides every `output.*` entry.
const PROVISIONED_DIRECTORIES: [&str; 3] = ["scripts", "templates", "logs"];

/// Mapping from logical name (e.g. `output.maps`, `data.wind_data`) to an
/// absolute filesystem location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedPathSet {
    entries: BTreeMap<String, PathBuf>,
}

impl ResolvedPathSet {
    /// Resolves every string leaf under the `paths` subtree against `base`.
    ///
    /// `base_directory` itself is recorded as `base` so that the set always
    /// carries the root it was computed from.
    pub fn from_paths_section(paths: Option<&Value>, base: &Path) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert("base_directory".to_string(), base.to_path_buf());

        if let Some(Value::Object(map)) = paths {
            for (key, value) in map {
                if key == "base_directory" {
                    continue;
                }
                collect(key, value, base, &mut entries);
            }
        }

        Self { entries }
    }

    /// Absolute path recorded for a logical name.
    pub fn get(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Directories that must exist before analysis runs.
    pub fn directories(&self) -> Vec<&Path> {
        self.entries
            .iter()
            .filter(|(name, _)| {
                name.starts_with("output.") || PROVISIONED_DIRECTORIES.contains(&name.as_str())
            })
            .map(|(_, path)| path.as_path())
            .collect()
    }
}

fn collect(prefix: &str, value: &Value, base: &Path, out: &mut BTreeMap<String, PathBuf>) {
    match value {
        Value::String(s) if !s.is_empty() => {
            out.insert(prefix.to_string(), absolutize(base, Path::new(s)));
        }
        Value::Object(map) => {
            for (key, nested) in map {
                collect(&format!("{}.{}", prefix, key), nested, base, out);
            }
        }
        _ => {}
    }
}

/// Outcome of a directory provisioning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Directories that exist after the pass (created or already present)
    pub ensured: Vec<PathBuf>,
    /// Directories that could not be created, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

impl ProvisionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates every directory of `set`, parents included.
///
/// A failure is logged and recorded, then the pass moves on to the next
/// directory.
pub fn provision(set: &ResolvedPathSet) -> ProvisionReport {
    let mut report = ProvisionReport::default();

    for dir in set.directories() {
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                debug!("Directory ready: {}", dir.display());
                report.ensured.push(dir.to_path_buf());
            }
            Err(e) => {
                warn!("Could not create directory {}: {}", dir.display(), e);
                report.failed.push((dir.to_path_buf(), e.to_string()));
            }
        }
    }

    report
}
