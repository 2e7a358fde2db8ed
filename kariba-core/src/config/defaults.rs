//! Built-in default configuration tree
//!
//! All paths under `paths` are relative so they resolve against
//! `paths.base_directory`.

use serde_json::{json, Value};
use std::path::Path;

use super::paths::default_venv_dir;

/// Default GitHub account for the setup automation.
pub const DEFAULT_GITHUB_USER: &str = "chawas";

/// Default repository name offered by the setup automation.
pub const DEFAULT_REPOSITORY: &str = "lake-kariba-wind-analysis";

/// Builds the default tree for a project rooted at `base_directory`.
///
/// `project.created` is stamped with today's date on every call.
pub fn default_tree(base_directory: &Path) -> Value {
    let created = chrono::Local::now().format("%Y-%m-%d").to_string();

    json!({
        "project": {
            "name": "Lake Kariba Wind Analysis",
            "version": "1.0.0",
            "description": "Wind analysis for floating solar panels at Lake Kariba",
            "created": created
        },
        "analysis_period": {
            "start_year": 2015,
            "end_year": 2020
        },
        "paths": {
            "base_directory": base_directory.to_string_lossy(),
            "data": {
                "wind_data": "data/era5_downloads/wind_data.nc",
                "era5_data": "data/era5_downloads/era5_data.nc",
                "lake_shapefile": "data/shapefiles/lake_kariba.shp"
            },
            "scripts": "scripts",
            "output": {
                "base": "output",
                "maps": "output/maps",
                "timeseries": "output/timeseries",
                "statistics": "output/statistics",
                "reports": "output/reports"
            },
            "templates": "templates",
            "logs": "logs"
        },
        "location": {
            "site_name": "Charara Floating Solar Site",
            "latitude": -16.53,
            "longitude": 28.83,
            "description": "Northeastern Lake Kariba, Zimbabwe"
        },
        "analysis_parameters": {
            "wind_speed_thresholds": {
                "normal_operation": 8.0,
                "caution": 12.0,
                "danger": 15.0,
                "emergency_shutdown": 18.0
            },
            "map_extent": {
                "min_lon": 26.5,
                "max_lon": 29.5,
                "min_lat": -18.0,
                "max_lat": -16.0
            },
            "highlight_radius": 0.2,
            "wind_speed_range": [0, 10]
        },
        "plotting": {
            "figure_size": [16, 12],
            "dpi": 300,
            "font_size": {
                "title": 16,
                "axis": 12,
                "legend": 10,
                "annotation": 9
            }
        },
        "launcher": {
            "venv_directory": default_venv_dir().to_string_lossy(),
            "analysis_script": "scripts/enhanced_wind_analysis.py",
            "python": "python3",
            "packages": ["numpy", "xarray", "pandas", "matplotlib"]
        },
        "github": {
            "username": DEFAULT_GITHUB_USER,
            "repository": DEFAULT_REPOSITORY
        }
    })
}
