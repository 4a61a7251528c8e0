//! Record contracts and the transient change model.
//!
//! # Responsibility
//! - Describe what a record must expose to take part in auditing,
//!   soft-delete, or read-only protection.
//! - Model the per-commit pending change list handed over by a storage engine.
//!
//! # Invariants
//! - A record type is either tracked (auditable and/or deletable) or
//!   read-only, never both.
//! - Pending changes live for exactly one commit attempt.

pub mod change;
pub mod entity;
