//! Output formatting utilities for the CLI
//!
//! Provides table and JSON formatting with colors.

use anyhow::Result;
use colored::*;
use kariba_core::{ConfigResolver, ResolvedPathSet};
use serde_json::{json, Value};

use tabled::{settings::Style, Table, Tabled};

/// Output format options
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Format the configuration summary
pub fn format_summary(config: &ConfigResolver, format: &OutputFormat) -> Result<String> {
    let text = |key: &str| {
        config
            .get(key)
            .map(display_value)
            .unwrap_or_else(|| "N/A".to_string())
    };
    let path = |name: &str| {
        config
            .get_path(name)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "N/A".to_string())
    };

    match format {
        OutputFormat::Json => {
            let thresholds: serde_json::Map<String, Value> = config
                .wind_thresholds()
                .into_iter()
                .map(|(name, value)| (name, json!(value)))
                .collect();
            let summary = json!({
                "config_file": config.config_file(),
                "format": config.format().to_string(),
                "project": config.get("project.name"),
                "version": config.get("project.version"),
                "analysis_period": {
                    "start_year": config.start_year(),
                    "end_year": config.end_year(),
                },
                "location": {
                    "site_name": config.get("location.site_name"),
                    "latitude": config.get_f64("location.latitude"),
                    "longitude": config.get_f64("location.longitude"),
                },
                "base_directory": config.base_directory(),
                "paths": config.resolved_paths(),
                "wind_speed_thresholds": thresholds,
                "provisioning_failures": config.provision_report().failed,
            });
            Ok(serde_json::to_string_pretty(&summary)?)
        }
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&"CONFIGURATION SUMMARY".bold().to_string());
            output.push('\n');
            output.push_str(&"=".repeat(60));
            output.push('\n');
            output.push_str(&format!("Config file: {}\n", config.config_file().display()));
            output.push_str(&format!("Project: {}\n", text("project.name").cyan()));
            output.push_str(&format!("Version: {}\n", text("project.version")));
            output.push_str(&format!(
                "Analysis Period: {}-{}\n",
                text("analysis_period.start_year").yellow(),
                text("analysis_period.end_year").yellow()
            ));

            output.push_str("\nLocation:\n");
            output.push_str(&format!("  Site: {}\n", text("location.site_name")));
            output.push_str(&format!(
                "  Coordinates: {}\n",
                format_coordinates(
                    config.get_f64("location.latitude"),
                    config.get_f64("location.longitude")
                )
            ));

            output.push_str("\nPaths:\n");
            output.push_str(&format!(
                "  Base Directory: {}\n",
                config.base_directory().display()
            ));
            output.push_str(&format!("  Wind Data: {}\n", path("data.wind_data")));
            output.push_str(&format!("  Output Base: {}\n", path("output.base")));
            for (label, name) in [
                ("Maps", "output.maps"),
                ("Timeseries", "output.timeseries"),
                ("Statistics", "output.statistics"),
                ("Reports", "output.reports"),
            ] {
                output.push_str(&format!("  • {}: {}\n", label, path(name)));
            }

            let thresholds = config.wind_thresholds();
            if !thresholds.is_empty() {
                output.push_str("\nWind Thresholds:\n");
                for (name, value) in thresholds {
                    output.push_str(&format!("  {}: {} m/s\n", title_case(&name), value));
                }
            }

            let failed = &config.provision_report().failed;
            if !failed.is_empty() {
                output.push('\n');
                for (dir, reason) in failed {
                    output.push_str(&format_warning(&format!(
                        "Could not create {}: {}",
                        dir.display(),
                        reason
                    )));
                    output.push('\n');
                }
            }

            output.push_str(&"=".repeat(60));
            Ok(output)
        }
    }
}

/// Format the resolved path set
pub fn format_paths(paths: &ResolvedPathSet, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(paths)?),
        OutputFormat::Table => {
            #[derive(Tabled)]
            struct PathRow {
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "Path")]
                path: String,
                #[tabled(rename = "Exists")]
                exists: String,
            }

            let rows: Vec<PathRow> = paths
                .iter()
                .map(|(name, path)| PathRow {
                    name: name.to_string(),
                    path: path.display().to_string(),
                    exists: if path.exists() {
                        "✓".green().to_string()
                    } else {
                        "✗".red().to_string()
                    },
                })
                .collect();

            let mut table = Table::new(rows);
            table.with(Style::rounded());
            Ok(table.to_string())
        }
    }
}

/// Format a single configuration value
pub fn format_value(value: &Value, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => match value {
            Value::Object(_) | Value::Array(_) => Ok(serde_json::to_string_pretty(value)?),
            other => Ok(display_value(other)),
        },
    }
}

/// Scalars without JSON quoting; containers as compact JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// `16.530°S, 28.830°E`
pub fn format_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> String {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => format!(
            "{:.3}°{}, {:.3}°{}",
            lat.abs(),
            if lat < 0.0 { "S" } else { "N" },
            lon.abs(),
            if lon < 0.0 { "W" } else { "E" }
        ),
        _ => "N/A".to_string(),
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Section header framed by `=` rules
pub fn format_banner(title: &str) -> String {
    let rule = "=".repeat(80);
    format!("\n{}\n{}\n{}", rule, title.bold(), rule)
}

/// Format success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}

/// Format error message
pub fn format_error(message: &str) -> String {
    format!("{} {}", "✗".red().bold(), message)
}

/// Format warning message
pub fn format_warning(message: &str) -> String {
    format!("{} {}", "⚠".yellow().bold(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kariba_core::ResolverOptions;
    use tempfile::TempDir;

    fn resolver(dir: &TempDir) -> ConfigResolver {
        ConfigResolver::load(ResolverOptions::new(dir.path()).with_config_file("config/test.json"))
    }

    #[test]
    fn test_format_coordinates_hemispheres() {
        assert_eq!(
            format_coordinates(Some(-16.53), Some(28.83)),
            "16.530°S, 28.830°E"
        );
        assert_eq!(format_coordinates(Some(1.0), Some(-2.5)), "1.000°N, 2.500°W");
        assert_eq!(format_coordinates(None, Some(1.0)), "N/A");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("emergency_shutdown"), "Emergency Shutdown");
        assert_eq!(title_case("caution"), "Caution");
    }

    #[test]
    fn test_display_value_unquotes_strings() {
        assert_eq!(display_value(&json!("output/maps")), "output/maps");
        assert_eq!(display_value(&json!(2015)), "2015");
        assert_eq!(display_value(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_summary_table_contains_key_fields() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir);

        let output = format_summary(&config, &OutputFormat::Table).unwrap();
        assert!(output.contains("CONFIGURATION SUMMARY"));
        assert!(output.contains("Lake Kariba Wind Analysis"));
        assert!(output.contains("2015"));
        assert!(output.contains("Charara Floating Solar Site"));
        assert!(output.contains("Emergency Shutdown: 18 m/s"));
    }

    #[test]
    fn test_summary_json_is_valid() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir);

        let output = format_summary(&config, &OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["analysis_period"]["start_year"], json!(2015));
        assert_eq!(parsed["wind_speed_thresholds"]["danger"], json!(15.0));
        assert!(parsed["provisioning_failures"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_paths_table_lists_logical_names() {
        let dir = TempDir::new().unwrap();
        let config = resolver(&dir);

        let output = format_paths(config.resolved_paths(), &OutputFormat::Table).unwrap();
        assert!(output.contains("output.maps"));
        assert!(output.contains("data.wind_data"));
    }

    #[test]
    fn test_format_value_scalar_and_mapping() {
        assert_eq!(
            format_value(&json!(2018), &OutputFormat::Table).unwrap(),
            "2018"
        );
        let mapping = format_value(&json!({"a": 1}), &OutputFormat::Table).unwrap();
        assert!(mapping.contains("\"a\": 1"));
    }
}
