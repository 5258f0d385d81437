//! Configuration loading and output folder resolution
//!
//! Output folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable `TAP_OUTPUT_FOLDER`
//! 3. TOML config file `output_folder`
//! 4. Compiled default `images` (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the output folder
pub const OUTPUT_FOLDER_ENV: &str = "TAP_OUTPUT_FOLDER";

/// Environment variable pointing at an explicit config file
pub const CONFIG_PATH_ENV: &str = "TAP_CONFIG";

/// Compiled default output folder (relative to the working directory)
pub const DEFAULT_OUTPUT_FOLDER: &str = "images";

/// Compiled default manifest file name
pub const DEFAULT_MANIFEST_PATH: &str = "images_metadata.json";

/// Media source endpoint (Wikimedia Commons action API)
pub const DEFAULT_API_ENDPOINT: &str = "https://commons.wikimedia.org/w/api.php";

/// User-Agent sent with every request to the media source
pub const USER_AGENT: &str = "TimeAndPlaceBot/1.0";

/// Get the standard user-agent string for HTTP clients
pub fn get_user_agent() -> String {
    USER_AGENT.to_string()
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Default query parameters for harvest runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarvestDefaults {
    #[serde(default = "default_radius_km")]
    pub radius_km: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

impl Default for HarvestDefaults {
    fn default() -> Self {
        Self {
            radius_km: default_radius_km(),
            limit: default_limit(),
            start_year: None,
            end_year: None,
        }
    }
}

/// A named location for the multi-location driver
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationConfig {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Contents of `tap.toml`
///
/// Every field is optional in the file; a missing file yields `TomlConfig::default()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub output_folder: Option<PathBuf>,
    #[serde(default)]
    pub manifest_path: Option<PathBuf>,
    #[serde(default = "get_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    /// Whole-request limit for searches; for downloads, the limit on
    /// receiving the response headers
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Longest a download body may go without delivering a chunk
    #[serde(default = "default_download_idle_timeout_secs")]
    pub download_idle_timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Pause between per-location queries in the multi-location driver
    #[serde(default = "default_query_delay_ms")]
    pub query_delay_ms: u64,
    /// Outbound request budget shared by searches and image downloads
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub harvest: HarvestDefaults,
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            output_folder: None,
            manifest_path: None,
            user_agent: get_user_agent(),
            api_endpoint: default_api_endpoint(),
            request_timeout_secs: default_request_timeout_secs(),
            download_idle_timeout_secs: default_download_idle_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            query_delay_ms: default_query_delay_ms(),
            requests_per_second: default_requests_per_second(),
            logging: LoggingConfig::default(),
            harvest: HarvestDefaults::default(),
            locations: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_radius_km() -> u32 {
    10
}

fn default_limit() -> u32 {
    30
}

fn default_api_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_download_idle_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_query_delay_ms() -> u64 {
    1000
}

fn default_requests_per_second() -> u32 {
    1
}

/// Locate the config file
///
/// Priority: explicit path → `TAP_CONFIG` → `<config_dir>/tap/tap.toml`.
/// Returns `None` when no candidate exists on disk.
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|d| d.join("tap").join("tap.toml"))
        .filter(|p| p.exists())
}

/// Load the TOML config, falling back to defaults when the file is absent
///
/// A file that exists but fails to parse is an error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config file found, using defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        debug!("Config file {} not found, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    debug!("Parsed configuration from {}", path.display());
    Ok(config)
}

/// Where the effective configuration came from, for the startup log
///
/// Loading runs before the subscriber exists, so binaries log this afterwards.
pub fn config_source(path: Option<&Path>) -> String {
    match path {
        Some(path) if path.is_file() => path.display().to_string(),
        Some(path) => format!("defaults ({} not found)", path.display()),
        None => "defaults (no config file)".to_string(),
    }
}

/// Resolve the output folder following the priority order in the module docs
pub fn resolve_output_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(OUTPUT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.output_folder {
        return path.clone();
    }

    // Priority 4: compiled default
    PathBuf::from(DEFAULT_OUTPUT_FOLDER)
}

/// Resolve the manifest path (CLI → TOML → default)
pub fn resolve_manifest_path(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    cli_arg
        .map(Path::to_path_buf)
        .or_else(|| toml_config.manifest_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST_PATH))
}

/// Create the output folder if missing
pub fn ensure_output_folder(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Output folder {} exists but is not a directory",
                path.display()
            )));
        }
        return Ok(());
    }

    std::fs::create_dir_all(path)?;
    info!("Created output folder: {}", path.display());
    Ok(())
}
