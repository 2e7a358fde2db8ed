//! Configuration resolver
//!
//! Loads the settings file, overlays it on the built-in defaults, resolves
//! every path entry against the base directory and makes sure the output
//! directories exist. Loading never fails: problems are logged and replaced by
//! defaults.

use serde_json::Value;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use super::defaults::default_tree;
use super::format::ConfigFormat;
use super::paths::{absolutize, config_file_from_env, default_project_root, probe_config_file};
use super::resolved::{provision, ProvisionReport, ResolvedPathSet};
use super::tree::{assign, lookup, overlay};
use crate::error::{KaribaError, Result};

/// Where the resolver looks for its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Explicit configuration file. Relative paths are taken from `project_root`.
    /// `None` probes the candidate locations.
    pub config_file: Option<PathBuf>,
    /// Project root used for the config file and as the default base directory
    pub project_root: PathBuf,
}

impl ResolverOptions {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            config_file: None,
            project_root: project_root.into(),
        }
    }

    pub fn with_config_file(mut self, config_file: impl Into<PathBuf>) -> Self {
        self.config_file = Some(config_file.into());
        self
    }

    /// Options from the environment: `KARIBA_PROJECT_ROOT` and `KARIBA_CONFIG`,
    /// with the documented fallbacks.
    pub fn from_env() -> Self {
        Self {
            config_file: config_file_from_env(),
            project_root: default_project_root(),
        }
    }
}

const REQUIRED_FIELDS: [&str; 5] = [
    "project.name",
    "analysis_period.start_year",
    "analysis_period.end_year",
    "location.latitude",
    "location.longitude",
];

const NUMERIC_FIELDS: [&str; 4] = [
    "analysis_period.start_year",
    "analysis_period.end_year",
    "location.latitude",
    "location.longitude",
];

/// How the tree was obtained during load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The file existed and parsed
    Loaded,
    /// No file existed; defaults were written to it
    CreatedDefault,
    /// The file was empty; defaults were written to it
    EmptyReplaced,
    /// The file could not be read or parsed; defaults are used in memory only
    FellBack,
}

/// Fully-populated, directory-materialized configuration.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    config_file: PathBuf,
    format: ConfigFormat,
    project_root: PathBuf,
    tree: Value,
    paths: ResolvedPathSet,
    provision: ProvisionReport,
    outcome: LoadOutcome,
}

impl ConfigResolver {
    /// Load configuration.
    ///
    /// - Missing file: defaults are used and written to the file.
    /// - Empty file: defaults are used and written to the file.
    /// - Malformed file: the error is logged and defaults are used; the file is
    ///   left as it is.
    /// - Directory creation failures are logged per directory and skipped.
    pub fn load(options: ResolverOptions) -> Self {
        let project_root = options.project_root;
        let config_file = match options.config_file {
            Some(file) => absolutize(&project_root, &file),
            None => probe_config_file(&project_root),
        };
        let format = ConfigFormat::from_path(&config_file);
        debug!(
            "Loading {} configuration from: {}",
            format,
            config_file.display()
        );

        let defaults = default_tree(&project_root);
        let (tree, outcome) = Self::read_tree(&config_file, format, defaults);

        let mut resolver = Self {
            config_file,
            format,
            project_root,
            tree,
            paths: ResolvedPathSet::default(),
            provision: ProvisionReport::default(),
            outcome,
        };

        if matches!(
            outcome,
            LoadOutcome::CreatedDefault | LoadOutcome::EmptyReplaced
        ) {
            match resolver.save() {
                Ok(()) => info!(
                    "Created default configuration at: {}",
                    resolver.config_file.display()
                ),
                Err(e) => error!("Error saving default config: {}", e),
            }
        }

        resolver.refresh();

        info!("Configuration loaded from: {}", resolver.config_file.display());
        if let Some(name) = resolver.get_str("project.name") {
            info!("Project: {}", name);
        }
        resolver
    }

    /// Load using [`ResolverOptions::from_env`].
    pub fn from_env() -> Self {
        Self::load(ResolverOptions::from_env())
    }

    fn read_tree(path: &Path, format: ConfigFormat, defaults: Value) -> (Value, LoadOutcome) {
        if !path.exists() {
            info!(
                "Configuration file not found: {}. Creating with defaults.",
                path.display()
            );
            return (defaults, LoadOutcome::CreatedDefault);
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                error!("Error loading config file {}: {}", path.display(), e);
                return (defaults, LoadOutcome::FellBack);
            }
        };

        if contents.trim().is_empty() {
            warn!("Config file is empty: {}", path.display());
            return (defaults, LoadOutcome::EmptyReplaced);
        }

        match format.parse(&contents) {
            Ok(Value::Null) => {
                warn!("Config file is empty: {}", path.display());
                (defaults, LoadOutcome::EmptyReplaced)
            }
            Ok(user @ Value::Object(_)) => (overlay(defaults, user), LoadOutcome::Loaded),
            Ok(other) => {
                error!(
                    "Error loading config file {}: top level is {}, expected a mapping",
                    path.display(),
                    value_kind(&other)
                );
                (defaults, LoadOutcome::FellBack)
            }
            Err(e) => {
                error!("Error parsing config file {}: {}", path.display(), e);
                (defaults, LoadOutcome::FellBack)
            }
        }
    }

    /// Recompute the resolved path set and provision directories.
    fn refresh(&mut self) {
        let base = self.base_directory();
        self.paths = ResolvedPathSet::from_paths_section(lookup(&self.tree, "paths"), &base);
        self.provision = provision(&self.paths);
        if self.provision.is_complete() {
            debug!("All {} directories created/verified", self.provision.ensured.len());
        } else {
            warn!(
                "{} of {} directories could not be created",
                self.provision.failed.len(),
                self.provision.failed.len() + self.provision.ensured.len()
            );
        }
    }

    // -- Accessors ----------------------------------------------------------

    /// The whole merged tree.
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    pub fn provision_report(&self) -> &ProvisionReport {
        &self.provision
    }

    pub fn resolved_paths(&self) -> &ResolvedPathSet {
        &self.paths
    }

    /// Dotted-key lookup (`"paths.output.base"`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        lookup(&self.tree, key)
    }

    /// Dotted-key lookup returning `default` when the key does not resolve.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    /// `paths.base_directory`, anchored at the project root when relative.
    pub fn base_directory(&self) -> PathBuf {
        match self.get_str("paths.base_directory") {
            Some(base) if !base.is_empty() => absolutize(&self.project_root, Path::new(base)),
            _ => self.project_root.clone(),
        }
    }

    /// Absolute paths stay as they are; relative ones are joined onto the base
    /// directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        absolutize(&self.base_directory(), path.as_ref())
    }

    /// Absolute path for a logical name (`output.maps`) or a full
    /// `paths.` key.
    ///
    /// Returns `None` when the entry is missing, empty or not a string.
    pub fn get_path(&self, name: &str) -> Option<PathBuf> {
        let key = if name.starts_with("paths.") {
            name.to_string()
        } else {
            format!("paths.{}", name)
        };

        match self.get_str(&key) {
            Some(value) if !value.is_empty() => Some(self.resolve_path(value)),
            _ => None,
        }
    }

    // -- Derived values -----------------------------------------------------

    pub fn start_year(&self) -> Option<i64> {
        self.get_i64("analysis_period.start_year")
    }

    pub fn end_year(&self) -> Option<i64> {
        self.get_i64("analysis_period.end_year")
    }

    /// Every year of the analysis period, both ends included.
    ///
    /// Empty when either end is missing or the period is reversed.
    pub fn years(&self) -> RangeInclusive<i64> {
        match (self.start_year(), self.end_year()) {
            (Some(start), Some(end)) => start..=end,
            _ => 1..=0,
        }
    }

    /// `<dir>/<base_name>_<start>_<end>.<extension>` where `dir` is
    /// `output.<subdirectory>` or `output.base`.
    pub fn output_filename(
        &self,
        base_name: &str,
        extension: &str,
        subdirectory: Option<&str>,
    ) -> Result<PathBuf> {
        let logical = match subdirectory {
            Some(sub) => format!("output.{}", sub),
            None => "output.base".to_string(),
        };
        let dir = self
            .get_path(&logical)
            .ok_or_else(|| KaribaError::KeyNotFound(format!("paths.{}", logical)))?;

        let year = |v: Option<i64>| v.map(|y| y.to_string()).unwrap_or_else(|| "None".to_string());
        Ok(dir.join(format!(
            "{}_{}_{}.{}",
            base_name,
            year(self.start_year()),
            year(self.end_year()),
            extension
        )))
    }

    /// Named wind speed thresholds in m/s, in file order.
    pub fn wind_thresholds(&self) -> Vec<(String, f64)> {
        match self.get("analysis_parameters.wind_speed_thresholds") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
                .collect(),
            _ => Vec::new(),
        }
    }

    // -- Validation ---------------------------------------------------------

    /// Check the fields the analysis cannot run without.
    ///
    /// Returns one message per problem, each also logged at `error`; an empty
    /// list means the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for field in REQUIRED_FIELDS {
            match self.get(field) {
                None | Some(Value::Null) => {
                    errors.push(format!("Missing required field: {}", field))
                }
                Some(Value::String(s)) if s.trim().is_empty() => {
                    errors.push(format!("Missing required field: {}", field))
                }
                _ => {}
            }
        }

        for field in NUMERIC_FIELDS {
            if matches!(self.get(field), Some(v) if !v.is_null() && !v.is_number()) {
                errors.push(format!("Field must be a number: {}", field));
            }
        }

        if let (Some(start), Some(end)) = (self.start_year(), self.end_year()) {
            if start > end {
                errors.push(format!(
                    "Analysis period is reversed: {} is after {}",
                    start, end
                ));
            }
        }

        if !matches!(self.get("paths.base_directory"), Some(Value::String(s)) if !s.is_empty()) {
            errors.push("Invalid or missing path: paths.base_directory".to_string());
        }
        if self.get_path("output.base").is_none() {
            errors.push("Invalid or missing path: output.base".to_string());
        }

        if errors.is_empty() {
            info!("Configuration validation passed");
        } else {
            error!("Configuration validation failed:");
            for message in &errors {
                error!("  - {}", message);
            }
        }
        errors
    }

    // -- Mutation -----------------------------------------------------------

    /// Serialize the tree to the backing file, replacing its contents.
    pub fn save(&self) -> Result<()> {
        write_tree(&self.config_file, self.format, &self.tree)?;
        debug!("Configuration saved to: {}", self.config_file.display());
        Ok(())
    }

    /// Write a copy of the tree, by default to `<output.base>/config_backup.<ext>`.
    ///
    /// The copy uses the destination's format when a destination is given.
    pub fn save_copy(&self, destination: Option<&Path>) -> Result<PathBuf> {
        let (path, format) = match destination {
            Some(dest) => {
                let dest = self.resolve_path(dest);
                let format = ConfigFormat::from_path(&dest);
                (dest, format)
            }
            None => {
                let output = self
                    .get_path("output.base")
                    .unwrap_or_else(|| self.base_directory().join("output"));
                (
                    output.join(format!("config_backup.{}", self.format.extension())),
                    self.format,
                )
            }
        };

        write_tree(&path, format, &self.tree)?;
        info!("Configuration backup saved to: {}", path.display());
        Ok(path)
    }

    /// Set a dotted key, refresh paths and directories, then save.
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        assign(&mut self.tree, key, value)?;
        self.refresh();
        self.save()
    }

    /// Replace the analysis period and save.
    pub fn update_analysis_period(&mut self, start_year: i64, end_year: i64) -> Result<()> {
        if start_year > end_year {
            return Err(KaribaError::InvalidInput(format!(
                "start year {} is after end year {}",
                start_year, end_year
            )));
        }

        assign(&mut self.tree, "analysis_period.start_year", Value::from(start_year))?;
        assign(&mut self.tree, "analysis_period.end_year", Value::from(end_year))?;
        self.save()?;
        info!("Analysis period set to {}-{}", start_year, end_year);
        Ok(())
    }

    /// Replace the tree with the built-in defaults and save.
    pub fn reset_to_defaults(&mut self) -> Result<()> {
        self.tree = default_tree(&self.project_root);
        self.refresh();
        self.save()
    }
}

fn write_tree(path: &Path, format: ConfigFormat, tree: &Value) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = format.render(tree)?;
    std::fs::write(path, contents)?;
    Ok(())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
