//! # Encore Domain
//!
//! Pure types shared by every Encore crate.
//!
//! This crate contains:
//! - Domain error types and Result definitions
//! - Configuration structures for the API access layer
//! - Protocol constants (paths, header and cookie names)
//!
//! ## Architecture
//! - No dependencies on other Encore crates
//! - Only external dependencies allowed
//! - No I/O

pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
