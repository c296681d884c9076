//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    AUTH_ENTRY_PATH, CSRF_COOKIE_NAME, CSRF_HEADER_NAME, DEFAULT_BASE_URL, DEFAULT_CONTENT_TYPE,
    DEFAULT_TIMEOUT_MS, EXCLUDED_PATHS, REFRESH_PATH,
};
use crate::errors::{EncoreError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend transport
    pub api: ApiConfig,
    /// Session continuity
    pub session: SessionConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Backend transport configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend origin every request path is appended to
    pub base_url: String,
    /// Per-request timeout in milliseconds; must be non-zero
    pub timeout_ms: u64,
    /// `Content-Type` sent when a call does not set its own
    pub content_type: String,
    /// Optional `User-Agent` override
    pub user_agent: Option<String>,
}

/// Session continuity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Endpoint posted to when a session expires
    pub refresh_path: String,
    /// Paths whose 401 responses pass through untouched
    pub excluded_paths: Vec<String>,
    /// How `excluded_paths` are matched
    pub path_match: PathMatch,
    /// Where the application is routed when the session cannot be recovered
    pub auth_entry_path: String,
    /// Cookie holding the anti-forgery token
    pub csrf_cookie: String,
    /// Header the anti-forgery token is sent in
    pub csrf_header: String,
}

/// How excluded paths are compared against request paths
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMatch {
    /// Whole path segments must match, so `/auth/login` does not cover
    /// `/auth/login2`. Query strings are ignored.
    #[default]
    Segments,
    /// Raw substring containment against the full request target.
    Substring,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            user_agent: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_path: REFRESH_PATH.to_string(),
            excluded_paths: EXCLUDED_PATHS.iter().map(|p| (*p).to_string()).collect(),
            path_match: PathMatch::default(),
            auth_entry_path: AUTH_ENTRY_PATH.to_string(),
            csrf_cookie: CSRF_COOKIE_NAME.to_string(),
            csrf_header: CSRF_HEADER_NAME.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

impl std::str::FromStr for PathMatch {
    type Err = EncoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "segments" => Ok(Self::Segments),
            "substring" => Ok(Self::Substring),
            other => Err(EncoreError::Config(format!("Unknown path match mode: {other}"))),
        }
    }
}

impl Config {
    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    /// Returns `EncoreError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(EncoreError::Config("api.base_url must not be empty".into()));
        }
        if self.api.timeout_ms == 0 {
            return Err(EncoreError::Config("api.timeout_ms must be greater than zero".into()));
        }

        let paths = [
            ("session.refresh_path", &self.session.refresh_path),
            ("session.auth_entry_path", &self.session.auth_entry_path),
        ];
        for (field, value) in paths {
            if !value.starts_with('/') {
                return Err(EncoreError::Config(format!("{field} must start with '/': {value}")));
            }
        }
        if let Some(bad) = self.session.excluded_paths.iter().find(|p| !p.starts_with('/')) {
            return Err(EncoreError::Config(format!(
                "session.excluded_paths entries must start with '/': {bad}"
            )));
        }
        if self.session.csrf_header.trim().is_empty() {
            return Err(EncoreError::Config("session.csrf_header must not be empty".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_contract() {
        let config = Config::default();

        assert_eq!(config.session.refresh_path, "/api/auth/refresh");
        assert_eq!(config.session.csrf_cookie, "csrftoken");
        assert_eq!(config.session.csrf_header, "X-CSRF-Token");
        assert_eq!(config.session.path_match, PathMatch::Segments);
        assert_eq!(
            config.session.excluded_paths,
            vec!["/auth/refresh", "/auth/me", "/auth/login", "/auth/register"]
        );
        assert_eq!(config.api.content_type, "application/json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
[api]
base_url = "https://api.encore.fm"

[session]
path_match = "substring"
"#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://api.encore.fm");
        assert_eq!(config.api.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.session.path_match, PathMatch::Substring);
        assert_eq!(config.session.auth_entry_path, "/login");
    }

    #[test]
    fn validate_rejects_relative_paths() {
        let mut config = Config::default();
        config.session.auth_entry_path = "login".into();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, EncoreError::Config(msg) if msg.contains("auth_entry_path")));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_ms = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn path_match_parses_case_insensitively() {
        assert_eq!("Segments".parse::<PathMatch>().unwrap(), PathMatch::Segments);
        assert_eq!("SUBSTRING".parse::<PathMatch>().unwrap(), PathMatch::Substring);
        assert!("prefix".parse::<PathMatch>().is_err());
    }
}
