//! Write-veto guards evaluated before any audit mutation.
//!
//! # Responsibility
//! - `scope`: per-unit-of-work read-only flag vetoing every write.
//! - `entity`: always-on veto for record types that are read-only.
//!
//! # Invariants
//! - Guards never mutate records or change sets.

pub mod entity;
pub mod scope;
