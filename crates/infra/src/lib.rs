//! # Encore Infrastructure
//!
//! Client-side HTTP access to the Encore backend.
//!
//! This crate contains:
//! - The cookie-backed HTTP transport
//! - The API client and its middleware pipeline (anti-forgery decoration,
//!   session continuity, request logging)
//! - Configuration loading from environment and files
//!
//! ## Architecture
//! - Depends on `encore-domain` for types and `encore-common` for the
//!   single-flight primitive and tracing setup
//! - Contains all "impure" code (network and file I/O)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientBuilder, ApiError, ApiResponse, BroadcastNavigator, Middleware, Navigator,
    RequestDescriptor, SessionRefresher,
};
pub use errors::InfraError;
pub use http::{CookieSource, HttpClient, JarCookieSource, MemoryCookieSource};
