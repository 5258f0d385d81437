//! Unit tests for configuration loading and output folder resolution
//!
//! Uses serial_test to prevent ENV variable race conditions: tests that
//! touch TAP_OUTPUT_FOLDER or TAP_CONFIG are marked #[serial].

use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tap_common::config::{
    config_source, ensure_output_folder, load_toml_config, locate_config_file, resolve_output_folder,
    TomlConfig, CONFIG_PATH_ENV, DEFAULT_OUTPUT_FOLDER, OUTPUT_FOLDER_ENV,
};
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(OUTPUT_FOLDER_ENV);

    let folder = resolve_output_folder(None, &TomlConfig::default());
    assert_eq!(folder, PathBuf::from(DEFAULT_OUTPUT_FOLDER));
}

#[test]
#[serial]
fn test_resolver_priority_order() {
    env::remove_var(OUTPUT_FOLDER_ENV);

    let mut config = TomlConfig::default();
    config.output_folder = Some(PathBuf::from("/tmp/tap-from-toml"));

    // TOML beats default
    assert_eq!(
        resolve_output_folder(None, &config),
        PathBuf::from("/tmp/tap-from-toml")
    );

    // ENV beats TOML
    env::set_var(OUTPUT_FOLDER_ENV, "/tmp/tap-from-env");
    assert_eq!(
        resolve_output_folder(None, &config),
        PathBuf::from("/tmp/tap-from-env")
    );

    // CLI beats ENV
    assert_eq!(
        resolve_output_folder(Some(Path::new("/tmp/tap-from-cli")), &config),
        PathBuf::from("/tmp/tap-from-cli")
    );

    env::remove_var(OUTPUT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_locate_config_prefers_env_over_user_dir() {
    env::set_var(CONFIG_PATH_ENV, "/tmp/tap-custom.toml");
    assert_eq!(
        locate_config_file(None),
        Some(PathBuf::from("/tmp/tap-custom.toml"))
    );
    assert_eq!(
        locate_config_file(Some(Path::new("explicit.toml"))),
        Some(PathBuf::from("explicit.toml"))
    );
    env::remove_var(CONFIG_PATH_ENV);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp = TempDir::new().unwrap();
    let config = load_toml_config(Some(&temp.path().join("absent.toml"))).unwrap();
    assert_eq!(config, TomlConfig::default());

    let config = load_toml_config(None).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_full_config_file_parses() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tap.toml");
    std::fs::write(
        &path,
        r#"
output_folder = "photos"
query_delay_ms = 2500
requests_per_second = 2

[logging]
level = "debug"

[harvest]
radius_km = 5
limit = 50
start_year = 1990
end_year = 2022

[[locations]]
name = "Paris"
lat = 48.8566
lon = 2.3522

[[locations]]
name = "Cairo"
lat = 30.0444
lon = 31.2357
"#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();
    assert_eq!(config.output_folder, Some(PathBuf::from("photos")));
    assert_eq!(config.query_delay_ms, 2500);
    assert_eq!(config.requests_per_second, 2);
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.harvest.radius_km, 5);
    assert_eq!(config.harvest.start_year, Some(1990));
    assert_eq!(config.harvest.end_year, Some(2022));
    assert_eq!(config.locations.len(), 2);
    assert_eq!(config.locations[1].name, "Cairo");
    // Unspecified keys keep their defaults
    assert_eq!(config.user_agent, "TimeAndPlaceBot/1.0");
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tap.toml");
    std::fs::write(&path, "query_delay_ms = \"soon\"").unwrap();

    let err = load_toml_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
fn test_ensure_output_folder_creates_nested() {
    let temp = TempDir::new().unwrap();
    let folder = temp.path().join("a").join("b");

    ensure_output_folder(&folder).unwrap();
    assert!(folder.is_dir());

    // Second call is a no-op
    ensure_output_folder(&folder).unwrap();
}

#[test]
fn test_ensure_output_folder_rejects_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();

    assert!(ensure_output_folder(&file).is_err());
}

#[test]
fn test_config_source_names_loaded_file_or_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("tap.toml");

    assert_eq!(config_source(None), "defaults (no config file)");
    assert_eq!(
        config_source(Some(&path)),
        format!("defaults ({} not found)", path.display())
    );

    std::fs::write(&path, "query_delay_ms = 10\n").unwrap();
    assert_eq!(config_source(Some(&path)), path.display().to_string());
}
