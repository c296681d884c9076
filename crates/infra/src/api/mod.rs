//! Backend API access layer
//!
//! Every call the application makes to its backend goes through
//! [`ApiClient`]. The client owns a middleware [`Pipeline`]:
//!
//! - [`RequestLogger`]: structured request/outcome logging
//! - [`CsrfDecorator`]: copies the `csrftoken` cookie into `X-CSRF-Token`
//! - caller-supplied layers
//! - [`SessionGuard`] (always innermost): refreshes an expired session once,
//!   shared across concurrent callers, and replays the call
//!
//! # Compliance
//!
//! - Structured tracing only (no println!)
//! - Timeout on all external calls
//! - Cookie and header values are never logged

pub mod client;
pub mod csrf;
pub mod errors;
pub mod logging;
pub mod navigation;
pub mod pipeline;
pub mod request;
pub mod session;

pub use client::{ApiClient, ApiClientBuilder};
pub use csrf::CsrfDecorator;
pub use errors::{ApiError, ApiErrorCategory};
pub use logging::RequestLogger;
pub use navigation::{is_within, BroadcastNavigator, NavigationEvent, Navigator};
pub use pipeline::{HttpTransport, Middleware, Next, Outcome, Pipeline, PipelineBuilder, Transport};
pub use request::{ApiResponse, RequestDescriptor};
pub use session::{ExcludedPaths, PipelineRefresher, SessionGuard, SessionRefresher};
