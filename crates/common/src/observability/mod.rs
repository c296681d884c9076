//! Tracing subscriber installation
//!
//! Library code only emits `tracing` events; binaries and test harnesses call
//! [`init_tracing`] once to decide where they go.

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter directive '{directive}': {message}")]
    InvalidFilter { directive: String, message: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_directive` when it is set and valid. With
/// `json` the events are written as one JSON object per line.
///
/// # Errors
/// Returns [`ObservabilityError::InvalidFilter`] if `default_directive` cannot
/// be parsed, or [`ObservabilityError::AlreadyInitialized`] if another
/// subscriber was installed first.
pub fn init_tracing(default_directive: &str, json: bool) -> Result<(), ObservabilityError> {
    let filter = build_filter(default_directive)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry.with(fmt::layer().json().with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|_| ObservabilityError::AlreadyInitialized)
}

fn build_filter(default_directive: &str) -> Result<EnvFilter, ObservabilityError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(default_directive).map_err(|e| ObservabilityError::InvalidFilter {
        directive: default_directive.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_module_directives() {
        assert!(build_filter("encore_infra=debug,info").is_ok());
    }

    #[test]
    fn second_install_reports_already_initialized() {
        let first = init_tracing("warn", false);
        let second = init_tracing("warn", true);

        // Another test binary thread may have won the first install.
        assert!(first.is_ok() || matches!(first, Err(ObservabilityError::AlreadyInitialized)));
        assert!(matches!(second, Err(ObservabilityError::AlreadyInitialized)));
    }
}
