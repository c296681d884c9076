//! API-specific error types
//!
//! Provides error classification for API operations.

use std::time::Duration;

use encore_domain::EncoreError;
use reqwest::StatusCode;
use thiserror::Error;

/// Categories of API errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403)
    Authentication,
    /// Rate limiting errors (429)
    RateLimit,
    /// Server errors (5xx)
    Server,
    /// Client errors (4xx except auth)
    Client,
    /// Network/connection errors, no response received
    Network,
    /// Configuration errors
    Config,
}

/// API operation errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// True when no HTTP response was received at all.
    pub fn is_transport(&self) -> bool {
        self.category() == ApiErrorCategory::Network
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: StatusCode, url: &str, body: &str) -> Self {
        let message = if body.is_empty() {
            format!("{} returned status {}", url, status)
        } else {
            format!("{} returned status {}: {}", url, status, body)
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Self::Auth(message)
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            Self::RateLimit(message)
        } else if status.is_server_error() {
            Self::Server(message)
        } else if status.is_client_error() {
            Self::Client(message)
        } else {
            Self::Network(message)
        }
    }
}

impl From<EncoreError> for ApiError {
    fn from(err: EncoreError) -> Self {
        match err {
            EncoreError::Network(message) => Self::Network(message),
            EncoreError::Auth(message) => Self::Auth(message),
            EncoreError::Config(message) => Self::Config(message),
            EncoreError::NotFound(message) | EncoreError::InvalidInput(message) => {
                Self::Client(message)
            }
            EncoreError::Internal(message) => Self::Server(message),
        }
    }
}
