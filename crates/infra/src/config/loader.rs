//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required variable is missing, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `ENCORE_API_BASE_URL`: Backend origin (required)
//! - `ENCORE_API_TIMEOUT_MS`: Per-request timeout in milliseconds
//! - `ENCORE_API_USER_AGENT`: `User-Agent` header value
//! - `ENCORE_AUTH_ENTRY_PATH`: Where the user is sent when the session is lost
//! - `ENCORE_REFRESH_PATH`: Session refresh endpoint
//! - `ENCORE_PATH_MATCH`: `segments` or `substring`
//! - `ENCORE_LOG_LEVEL`: Default tracing filter directive
//! - `ENCORE_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./encore.json` or `./encore.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. `../../config.json` or `../../config.toml` (grandparent directory)
//! 5. Relative to executable location

use std::path::{Path, PathBuf};

use encore_domain::{Config, EncoreError, PathMatch, Result};

/// Load configuration with automatic fallback strategy
///
/// First attempts to load from environment variables. If the required
/// variable is missing or a value is invalid, falls back to a config file.
///
/// # Errors
/// Returns `EncoreError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - Validation fails
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// Unset optional variables keep their defaults.
///
/// # Errors
/// Returns `EncoreError::Config` if `ENCORE_API_BASE_URL` is missing or a
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.api.base_url = env_var("ENCORE_API_BASE_URL")?;
    if let Some(timeout) = env_opt("ENCORE_API_TIMEOUT_MS") {
        config.api.timeout_ms = timeout
            .parse::<u64>()
            .map_err(|e| EncoreError::Config(format!("Invalid timeout: {}", e)))?;
    }
    config.api.user_agent = env_opt("ENCORE_API_USER_AGENT").or(config.api.user_agent);

    if let Some(path) = env_opt("ENCORE_AUTH_ENTRY_PATH") {
        config.session.auth_entry_path = path;
    }
    if let Some(path) = env_opt("ENCORE_REFRESH_PATH") {
        config.session.refresh_path = path;
    }
    if let Some(mode) = env_opt("ENCORE_PATH_MATCH") {
        config.session.path_match = mode.parse::<PathMatch>()?;
    }

    if let Some(level) = env_opt("ENCORE_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("ENCORE_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension). Missing
/// sections and fields take their defaults.
///
/// # Errors
/// Returns `EncoreError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Validation fails
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(EncoreError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            EncoreError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| EncoreError::Config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| EncoreError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| EncoreError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(EncoreError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(candidate_files(&cwd));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(candidate_files(exe_dir));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn candidate_files(dir: &Path) -> Vec<PathBuf> {
    vec![
        dir.join("config.json"),
        dir.join("config.toml"),
        dir.join("encore.json"),
        dir.join("encore.toml"),
        dir.join("../config.json"),
        dir.join("../config.toml"),
        dir.join("../../config.json"),
        dir.join("../../config.toml"),
    ]
}

/// Get required environment variable
///
/// # Errors
/// Returns `EncoreError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        EncoreError::Config(format!("Missing required environment variable: {}", key))
    })
}

/// Optional environment variable; empty values count as unset.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
