//! Async coordination primitives
//!
//! - [`SingleFlight`]: collapse concurrent invocations of the same async
//!   operation into one execution whose result is fanned out to every caller.

pub mod single_flight;

pub use single_flight::{FlightRole, SingleFlight};
