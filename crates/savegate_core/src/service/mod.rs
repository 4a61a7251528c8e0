//! Caller-facing use-case services.
//!
//! # Responsibility
//! - Bundle a record store, the save interceptor and a unit-of-work context
//!   into one entry point.
//! - Keep callers away from staging and pipeline wiring details.

pub mod session;
