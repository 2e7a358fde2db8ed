//! On-disk formats for the configuration tree

use serde_json::Value;
use std::path::Path;

use crate::error::Result;

/// Serialization format of a configuration file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.yaml` and `.yml` select YAML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }

    /// File extension used for backups written in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            ConfigFormat::Yaml => "yaml",
        }
    }

    /// Parse file contents into an untyped tree.
    pub fn parse(&self, contents: &str) -> Result<Value> {
        match self {
            ConfigFormat::Json => Ok(serde_json::from_str(contents)?),
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(contents)?),
        }
    }

    /// Render a tree for writing back to disk.
    pub fn render(&self, tree: &Value) -> Result<String> {
        match self {
            ConfigFormat::Json => {
                let mut out = serde_json::to_string_pretty(tree)?;
                out.push('\n');
                Ok(out)
            }
            ConfigFormat::Yaml => Ok(serde_yaml::to_string(tree)?),
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Json => write!(f, "JSON"),
            ConfigFormat::Yaml => write!(f, "YAML"),
        }
    }
}
