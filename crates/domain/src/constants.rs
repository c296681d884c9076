//! Protocol constants
//!
//! Centralized location for the backend contract the API access layer
//! depends on.

// Anti-forgery material
/// Cookie carrying the anti-forgery token.
pub const CSRF_COOKIE_NAME: &str = "csrftoken";
/// Header the token is copied into.
pub const CSRF_HEADER_NAME: &str = "X-CSRF-Token";

// Session endpoints
/// Endpoint restoring an expired session.
pub const REFRESH_PATH: &str = "/api/auth/refresh";
/// Unauthenticated liveness endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Paths whose 401 responses are never intercepted. Matched against the
/// request path; see `PathMatch` for the matching mode.
pub const EXCLUDED_PATHS: [&str; 4] = ["/auth/refresh", "/auth/me", "/auth/login", "/auth/register"];

// Navigation
/// Location of the sign-in screen.
pub const AUTH_ENTRY_PATH: &str = "/login";
/// Initial location of a fresh navigator.
pub const ROOT_LOCATION: &str = "/";

// Transport defaults
/// Backend origin used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Default request `Content-Type`.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
/// Per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Timeout for the health probe.
pub const HEALTH_CHECK_TIMEOUT_MS: u64 = 5_000;
