//! Modular common utilities shared across Encore crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `runtime`: async coordination primitives (single-flight)
//! - `observability`: tracing subscriber installation

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod sync;

// Observability tier
// --------------------------------------------------------------------
#[cfg(feature = "observability")]
pub mod observability;

// Re-export commonly used types for convenience
// ------------------------
#[cfg(feature = "observability")]
pub use observability::{init_tracing, ObservabilityError};
#[cfg(feature = "runtime")]
pub use sync::{FlightRole, SingleFlight};
