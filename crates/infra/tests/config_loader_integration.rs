//! Integration tests for configuration loader
//!
//! Tests the end-to-end behavior of loading configuration from files and
//! building a client from it.

use std::io::Write;
use std::path::PathBuf;

use encore_domain::{EncoreError, PathMatch};
use encore_infra::config;
use encore_infra::ApiClient;
use tempfile::NamedTempFile;

fn write_temp(contents: &str, extension: &str) -> PathBuf {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file.write_all(contents.as_bytes()).expect("Failed to write to temp file");

    let path = temp_file.path().with_extension(extension);
    std::fs::copy(temp_file.path(), &path).expect("Failed to copy file");
    path
}

#[test]
fn test_load_config_from_json_file() {
    let path = write_temp(
        r#"{
            "api": {
                "base_url": "https://api.encore.test",
                "timeout_ms": 10000,
                "user_agent": "encore-web/2.3"
            },
            "session": {
                "refresh_path": "/api/auth/refresh",
                "excluded_paths": ["/auth/refresh", "/auth/me", "/auth/login", "/auth/register"],
                "path_match": "segments",
                "auth_entry_path": "/login"
            },
            "logging": { "level": "warn", "json": true }
        }"#,
        "json",
    );

    let result = config::load_from_file(Some(path.clone()));
    assert!(result.is_ok(), "Failed to load config from JSON file: {:?}", result.err());

    let config = result.unwrap();

    // Verify API configuration
    assert_eq!(config.api.base_url, "https://api.encore.test");
    assert_eq!(config.api.timeout_ms, 10000);
    assert_eq!(config.api.user_agent.as_deref(), Some("encore-web/2.3"));

    // Verify session configuration
    assert_eq!(config.session.excluded_paths.len(), 4);
    assert_eq!(config.session.path_match, PathMatch::Segments);

    // Verify logging configuration
    assert_eq!(config.logging.level, "warn");
    assert!(config.logging.json);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_load_config_from_toml_file() {
    let path = write_temp(
        r#"
[api]
base_url = "http://localhost:8000"
timeout_ms = 15000

[session]
path_match = "substring"
auth_entry_path = "/signin"
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("TOML config should load");

    assert_eq!(config.api.timeout_ms, 15000);
    assert_eq!(config.session.path_match, PathMatch::Substring);
    assert_eq!(config.session.auth_entry_path, "/signin");
    assert_eq!(config.session.csrf_cookie, "csrftoken");

    std::fs::remove_file(path).ok();
}

#[test]
fn test_invalid_config_is_rejected() {
    let path = write_temp(r#"{ "api": { "timeout_ms": 0 } }"#, "json");

    let result = config::load_from_file(Some(path.clone()));
    assert!(matches!(result, Err(EncoreError::Config(_))));

    std::fs::remove_file(path).ok();
}

#[tokio::test]
async fn test_client_builds_from_loaded_config() {
    let path = write_temp(
        r#"
[api]
base_url = "http://127.0.0.1:8000/"

[session]
auth_entry_path = "/welcome"
"#,
        "toml",
    );

    let config = config::load_from_file(Some(path.clone())).expect("config should load");
    let client = ApiClient::builder().config(config).build().expect("client should build");

    assert_eq!(client.config().session.auth_entry_path, "/welcome");
    assert_eq!(client.pipeline().layer_names(), vec!["logger", "csrf", "session"]);

    std::fs::remove_file(path).ok();
}
