//! Behavioural tests for the configuration resolver
//!
//! Each test works inside its own temporary project root.

use kariba_core::config::default_tree;
use kariba_core::{ConfigResolver, LoadOutcome, ResolverOptions};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn options(root: &Path, file: &str) -> ResolverOptions {
    ResolverOptions::new(root).with_config_file(file)
}

#[test]
fn test_missing_file_creates_defaults_and_directories() {
    let root = TempDir::new().unwrap();
    let resolver = ConfigResolver::load(options(root.path(), "./config/test.json"));

    let config_file = root.path().join("config/test.json");
    assert!(config_file.is_file(), "default config should be persisted");
    assert_eq!(resolver.outcome(), LoadOutcome::CreatedDefault);

    let on_disk: Value =
        serde_json::from_str(&std::fs::read_to_string(&config_file).unwrap()).unwrap();
    assert_eq!(&on_disk, resolver.tree());

    for dir in ["maps", "timeseries", "statistics", "reports"] {
        assert!(
            root.path().join("output").join(dir).is_dir(),
            "output/{} should exist",
            dir
        );
    }

    assert_eq!(resolver.get("analysis_period.start_year"), Some(&json!(2015)));
}

#[test]
fn test_partial_file_merges_one_level_deep() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("config")).unwrap();
    std::fs::write(
        root.path().join("config/test.json"),
        r#"{"analysis_period": {"start_year": 2018}}"#,
    )
    .unwrap();

    let resolver = ConfigResolver::load(options(root.path(), "config/test.json"));

    assert_eq!(resolver.outcome(), LoadOutcome::Loaded);
    assert_eq!(resolver.start_year(), Some(2018));
    assert_eq!(resolver.end_year(), Some(2020));
}

#[test]
fn test_keys_missing_from_file_resolve_to_defaults() {
    let root = TempDir::new().unwrap();
    std::fs::write(
        root.path().join("partial.json"),
        r#"{"location": {"site_name": "Kariba Gorge"}}"#,
    )
    .unwrap();

    let resolver = ConfigResolver::load(options(root.path(), "partial.json"));
    let defaults = default_tree(root.path());

    for key in [
        "project.name",
        "analysis_period.end_year",
        "location.latitude",
        "paths.output.maps",
        "analysis_parameters.wind_speed_thresholds.danger",
    ] {
        let expected = kariba_core::config::lookup(&defaults, key);
        assert_eq!(resolver.get(key), expected, "key {}", key);
    }
    assert_eq!(resolver.get_str("location.site_name"), Some("Kariba Gorge"));
}

#[test]
fn test_malformed_json_falls_back_to_defaults() {
    let root = TempDir::new().unwrap();
    let broken = "{\"analysis_period\": {\"start_year\": 2018,,}";
    std::fs::write(root.path().join("broken.json"), broken).unwrap();

    let resolver = ConfigResolver::load(options(root.path(), "broken.json"));

    assert_eq!(resolver.outcome(), LoadOutcome::FellBack);
    assert_eq!(resolver.tree(), &default_tree(root.path()));
    // The user's file is kept for repair
    assert_eq!(
        std::fs::read_to_string(root.path().join("broken.json")).unwrap(),
        broken
    );
}

#[test]
fn test_resolve_path_relative_and_absolute() {
    let root = TempDir::new().unwrap();
    let resolver = ConfigResolver::load(options(root.path(), "config/test.json"));
    let base = resolver.base_directory();

    for relative in ["output", "data/era5_downloads/wind_data.nc", "a/b/../c"] {
        assert_eq!(resolver.resolve_path(relative), base.join(relative));
    }

    let absolute = PathBuf::from("/var/tmp/elsewhere");
    assert_eq!(resolver.resolve_path(&absolute), absolute);
}

#[test]
fn test_loading_twice_is_idempotent() {
    let root = TempDir::new().unwrap();
    let first = ConfigResolver::load(options(root.path(), "config/test.json"));
    let second = ConfigResolver::load(options(root.path(), "config/test.json"));

    assert_eq!(second.outcome(), LoadOutcome::Loaded);
    assert_eq!(first.resolved_paths(), second.resolved_paths());
    assert!(second.provision_report().is_complete());
    assert_eq!(
        first.provision_report().ensured,
        second.provision_report().ensured
    );
}

#[test]
fn test_save_then_reload_reproduces_tree() {
    let root = TempDir::new().unwrap();
    let mut resolver = ConfigResolver::load(options(root.path(), "config/test.json"));

    resolver
        .set("location.site_name", json!("Sanyati Basin"))
        .unwrap();
    resolver
        .set("analysis_parameters.map_extent", json!({"min_lon": 27.0}))
        .unwrap();
    resolver.update_analysis_period(2010, 2012).unwrap();

    let reloaded = ConfigResolver::load(options(root.path(), "config/test.json"));
    assert_eq!(reloaded.tree(), resolver.tree());
    assert_eq!(reloaded.years().collect::<Vec<_>>(), vec![2010, 2011, 2012]);
}

#[test]
fn test_yaml_file_round_trip_keeps_extra_sections() {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("config")).unwrap();
    std::fs::write(
        root.path().join("config/kariba_config.yaml"),
        r#"
analysis_period:
  end_year: 2022
era5:
  dataset: reanalysis-era5-single-levels
  area: [-10.0, 26.0, -18.0, 30.0]
"#,
    )
    .unwrap();

    let resolver = ConfigResolver::load(ResolverOptions::new(root.path()));
    assert_eq!(
        resolver.config_file(),
        root.path().join("config/kariba_config.yaml")
    );
    assert_eq!(resolver.end_year(), Some(2022));
    assert_eq!(
        resolver.get_str("era5.dataset"),
        Some("reanalysis-era5-single-levels")
    );

    resolver.save().unwrap();
    let reloaded = ConfigResolver::load(ResolverOptions::new(root.path()));
    assert_eq!(reloaded.tree(), resolver.tree());
}

#[test]
fn test_set_path_reprovisions_directories() {
    let root = TempDir::new().unwrap();
    let mut resolver = ConfigResolver::load(options(root.path(), "config/test.json"));

    resolver
        .set("paths.output.clustering", json!("output/clustering"))
        .unwrap();

    assert_eq!(
        resolver.resolved_paths().get("output.clustering"),
        Some(root.path().join("output/clustering").as_path())
    );
    assert!(root.path().join("output/clustering").is_dir());
}

#[test]
fn test_save_copy_defaults_to_output_base() {
    let root = TempDir::new().unwrap();
    let resolver = ConfigResolver::load(options(root.path(), "config/test.json"));

    let backup = resolver.save_copy(None).unwrap();
    assert_eq!(backup, root.path().join("output/config_backup.json"));

    let yaml_backup = resolver.save_copy(Some(Path::new("backups/copy.yaml"))).unwrap();
    let contents = std::fs::read_to_string(&yaml_backup).unwrap();
    assert!(contents.contains("site_name: Charara Floating Solar Site"));
}

#[cfg(unix)]
#[test]
fn test_unwritable_output_does_not_abort_load() {
    use std::os::unix::fs::PermissionsExt;

    let root = TempDir::new().unwrap();
    let locked = root.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();

    // Running as root bypasses permission bits; nothing to observe then.
    if std::fs::create_dir(locked.join("writable-check")).is_ok() {
        return;
    }

    std::fs::write(
        root.path().join("cfg.json"),
        r#"{"paths": {"output": {"base": "locked/output", "maps": "maps"}}}"#,
    )
    .unwrap();
    let resolver = ConfigResolver::load(options(root.path(), "cfg.json"));

    let report = resolver.provision_report();
    assert_eq!(report.failed.len(), 1);
    assert!(root.path().join("maps").is_dir());
    assert!(root.path().join("logs").is_dir());

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn test_unwritable_missing_file_still_loads_defaults() {
    let root = TempDir::new().unwrap();
    // A regular file where the config directory should be
    std::fs::write(root.path().join("blocker"), "").unwrap();

    let resolver = ConfigResolver::load(options(root.path(), "blocker/kariba_config.json"));

    assert_eq!(resolver.outcome(), LoadOutcome::CreatedDefault);
    assert_eq!(resolver.tree(), &default_tree(root.path()));
    assert_eq!(resolver.start_year(), Some(2015));
    assert!(!root.path().join("blocker/kariba_config.json").exists());
    assert!(root.path().join("output/maps").is_dir());
    assert!(resolver.save().is_err());
}

#[cfg(unix)]
#[test]
fn test_unwritable_empty_file_still_loads_defaults() {
    use std::os::unix::fs::PermissionsExt;

    let root = TempDir::new().unwrap();
    let config_file = root.path().join("readonly.json");
    std::fs::write(&config_file, "   \n").unwrap();
    std::fs::set_permissions(&config_file, std::fs::Permissions::from_mode(0o444)).unwrap();

    // Running as root bypasses permission bits; nothing to observe then.
    if std::fs::OpenOptions::new().write(true).open(&config_file).is_ok() {
        return;
    }

    let resolver = ConfigResolver::load(options(root.path(), "readonly.json"));

    assert_eq!(resolver.outcome(), LoadOutcome::EmptyReplaced);
    assert_eq!(resolver.end_year(), Some(2020));
    assert_eq!(std::fs::read_to_string(&config_file).unwrap(), "   \n");
}
