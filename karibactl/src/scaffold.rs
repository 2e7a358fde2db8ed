//! Project layout scaffolding for `karibactl init`

use anyhow::{Context, Result};
use kariba_core::ConfigResolver;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directories `init` created or found already present.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScaffoldReport {
    pub created: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
    pub requirements: Option<PathBuf>,
}

/// Every directory the project expects.
///
/// Provisioned directories come from the resolved path set; data files
/// contribute their parent directory. The config file's directory is included
/// too.
pub fn layout(config: &ConfigResolver) -> Vec<PathBuf> {
    let paths = config.resolved_paths();
    let mut dirs: Vec<PathBuf> = paths.directories().into_iter().map(Path::to_path_buf).collect();

    for (name, path) in paths.iter() {
        if name.starts_with("data.") {
            if let Some(parent) = path.parent() {
                dirs.push(parent.to_path_buf());
            }
        }
    }
    if let Some(parent) = config.config_file().parent() {
        dirs.push(parent.to_path_buf());
    }

    dirs.sort();
    dirs.dedup();
    dirs
}

/// Create the directory layout and a `requirements.txt` next to the analysis
/// script if none exists.
pub fn scaffold(config: &ConfigResolver) -> Result<ScaffoldReport> {
    let mut report = ScaffoldReport::default();

    for dir in layout(config) {
        if dir.is_dir() {
            report.existing.push(dir);
            continue;
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        debug!("Created {}", dir.display());
        report.created.push(dir);
    }

    let scripts = config
        .get_path("scripts")
        .unwrap_or_else(|| config.base_directory().join("scripts"));
    let requirements = scripts.join("requirements.txt");
    if !requirements.exists() {
        std::fs::create_dir_all(&scripts)
            .with_context(|| format!("Failed to create {}", scripts.display()))?;
        std::fs::write(&requirements, requirements_text(config))
            .with_context(|| format!("Failed to write {}", requirements.display()))?;
        report.requirements = Some(requirements);
    }

    Ok(report)
}

fn requirements_text(config: &ConfigResolver) -> String {
    let mut text = String::new();
    if let Some(packages) = config.get("launcher.packages").and_then(|p| p.as_array()) {
        for package in packages.iter().filter_map(|p| p.as_str()) {
            text.push_str(package);
            text.push('\n');
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use kariba_core::ResolverOptions;
    use tempfile::TempDir;

    fn resolver(dir: &TempDir) -> ConfigResolver {
        ConfigResolver::load(ResolverOptions::new(dir.path()))
    }

    #[test]
    fn test_layout_includes_data_parents() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir);

        let dirs = layout(&config);
        assert!(dirs.contains(&dir.path().join("data").join("era5_downloads")));
        assert!(dirs.contains(&dir.path().join("data").join("shapefiles")));
        assert!(dirs.contains(&dir.path().join("output").join("maps")));
        assert!(dirs.contains(&dir.path().join("config")));
    }

    #[test]
    fn test_scaffold_creates_missing_and_reports_existing() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir);

        let report = scaffold(&config).unwrap();
        assert!(dir.path().join("data/era5_downloads").is_dir());
        assert!(dir.path().join("data/shapefiles").is_dir());
        assert!(report.created.contains(&dir.path().join("data").join("shapefiles")));
        // output dirs were provisioned at load time
        assert!(report.existing.contains(&dir.path().join("output").join("maps")));

        let requirements = report.requirements.unwrap();
        let text = std::fs::read_to_string(requirements).unwrap();
        assert!(text.contains("xarray"));
    }

    #[test]
    fn test_scaffold_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir);

        scaffold(&config).unwrap();
        let second = scaffold(&config).unwrap();
        assert!(second.created.is_empty());
        assert!(second.requirements.is_none());
    }
}
