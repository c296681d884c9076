//! Session continuity
//!
//! [`SessionGuard`] is the innermost pipeline layer. It watches for `401`
//! responses on ordinary endpoints, restores the session with a single
//! coordinated refresh call, and replays the original request once. When the
//! refresh itself fails the user is sent to the auth entry location and the
//! caller gets the original `401` back.
//!
//! Concurrent expiries share one refresh through [`SingleFlight`]; each caller
//! then replays its own request independently.

use std::sync::Arc;

use async_trait::async_trait;
use encore_common::{FlightRole, SingleFlight};
use encore_domain::constants::{AUTH_ENTRY_PATH, EXCLUDED_PATHS, REFRESH_PATH};
use encore_domain::{PathMatch, SessionConfig};
use reqwest::StatusCode;
use tracing::{debug, info, warn};

use super::errors::ApiError;
use super::navigation::{is_within, strip_query, Navigator};
use super::pipeline::{Middleware, Next, Outcome};
use super::request::RequestDescriptor;

/// Endpoints whose `401` is returned as-is instead of triggering a refresh.
#[derive(Debug, Clone)]
pub struct ExcludedPaths {
    paths: Vec<String>,
    mode: PathMatch,
}

impl ExcludedPaths {
    /// Exclusion list compared against request paths using `mode`.
    pub fn new<I, S>(paths: I, mode: PathMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect(), mode }
    }

    /// Whether a `401` from `path` should be returned without a refresh.
    pub fn matches(&self, path: &str) -> bool {
        match self.mode {
            PathMatch::Substring => self.paths.iter().any(|p| path.contains(p.as_str())),
            PathMatch::Segments => {
                let path = strip_query(path);
                self.paths.iter().any(|p| contains_segments(path, p))
            }
        }
    }
}

impl Default for ExcludedPaths {
    fn default() -> Self {
        Self::new(EXCLUDED_PATHS, PathMatch::Segments)
    }
}

/// True if `needle`'s segments appear as a contiguous run of whole segments
/// in `path`. `/api/auth/login` contains `/auth/login`; `/api/auth/login2`
/// does not.
fn contains_segments(path: &str, needle: &str) -> bool {
    let needle: Vec<&str> = needle.split('/').filter(|s| !s.is_empty()).collect();
    if needle.is_empty() {
        return false;
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Re-establishes an expired session.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Attempt one refresh. `next` dispatches through the pipeline from the
    /// session layer's position.
    async fn refresh(&self, next: &Next) -> Result<(), ApiError>;
}

/// Refreshes by posting to the refresh endpoint through the pipeline, so the
/// call carries the same decoration as any other request.
#[derive(Debug, Clone)]
pub struct PipelineRefresher {
    path: String,
}

impl PipelineRefresher {
    /// Refresher that posts to `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for PipelineRefresher {
    fn default() -> Self {
        Self::new(REFRESH_PATH)
    }
}

#[async_trait]
impl SessionRefresher for PipelineRefresher {
    async fn refresh(&self, next: &Next) -> Result<(), ApiError> {
        let mut request = RequestDescriptor::post(self.path.as_str());
        // A 401 from the refresh call must never start another refresh.
        request.mark_retried();

        let response = next.dispatch(request).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(ApiError::from_status(response.status(), response.url(), &response.text()))
        }
    }
}

/// Innermost layer that recovers from session expiry.
pub struct SessionGuard {
    excluded: ExcludedPaths,
    refresher: Arc<dyn SessionRefresher>,
    navigator: Arc<dyn Navigator>,
    auth_entry_path: String,
    flight: SingleFlight<Result<(), ApiError>>,
}

impl SessionGuard {
    /// Guard redirecting to the default auth entry path on refresh failure.
    pub fn new(
        excluded: ExcludedPaths,
        refresher: Arc<dyn SessionRefresher>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            excluded,
            refresher,
            navigator,
            auth_entry_path: AUTH_ENTRY_PATH.to_string(),
            flight: SingleFlight::new(),
        }
    }

    /// Build a guard from session settings.
    pub fn from_config(
        config: &SessionConfig,
        refresher: Arc<dyn SessionRefresher>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let excluded = ExcludedPaths::new(config.excluded_paths.iter().cloned(), config.path_match);
        Self::new(excluded, refresher, navigator).with_auth_entry_path(config.auth_entry_path.clone())
    }

    /// Override where the user is sent when the session cannot be restored.
    pub fn with_auth_entry_path(mut self, path: impl Into<String>) -> Self {
        self.auth_entry_path = path.into();
        self
    }

    /// Whether a refresh is currently pending.
    pub fn is_refreshing(&self) -> bool {
        self.flight.is_in_flight()
    }

    fn is_session_expiry(&self, request: &RequestDescriptor, outcome: &Outcome) -> bool {
        matches!(outcome, Ok(response) if response.status() == StatusCode::UNAUTHORIZED)
            && !request.is_retried()
            && !self.excluded.matches(request.path())
    }

    /// Join or lead the shared refresh. A failed refresh redirects inside the
    /// flight, so one failed wave navigates at most once however many callers
    /// are waiting on it.
    async fn refresh(&self, next: &Next) -> Result<(), ApiError> {
        let refresher = Arc::clone(&self.refresher);
        let navigator = Arc::clone(&self.navigator);
        let auth_entry_path = self.auth_entry_path.clone();
        let next = next.clone();
        let (result, role) = self
            .flight
            .run(move || async move {
                let result = refresher.refresh(&next).await;
                if let Err(err) = &result {
                    warn!(error = %err, "session refresh failed");
                    send_to_auth_entry(&*navigator, &auth_entry_path);
                }
                result
            })
            .await;

        match role {
            FlightRole::Leader => debug!(ok = result.is_ok(), "session refresh settled"),
            FlightRole::Follower => debug!(ok = result.is_ok(), "joined in-flight session refresh"),
        }
        result
    }
}

fn send_to_auth_entry(navigator: &dyn Navigator, auth_entry_path: &str) {
    let current = navigator.current_location();
    if is_within(&current, auth_entry_path) {
        debug!(location = %strip_query(&current), "already at auth entry; not navigating");
        return;
    }
    navigator.navigate(auth_entry_path);
}

#[async_trait]
impl Middleware for SessionGuard {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn on_response(
        &self,
        request: &mut RequestDescriptor,
        outcome: Outcome,
        next: &Next,
    ) -> Outcome {
        if !self.is_session_expiry(request, &outcome) {
            return outcome;
        }

        let path = strip_query(request.path()).to_string();
        info!(method = %request.method(), path = %path, "session expired; refreshing");

        match self.refresh(next).await {
            Ok(()) => {
                request.mark_retried();
                debug!(method = %request.method(), path = %path, "replaying after refresh");
                next.dispatch(request.clone()).await
            }
            Err(err) => {
                debug!(path = %path, error = %err, "returning original 401");
                outcome
            }
        }
    }
}
