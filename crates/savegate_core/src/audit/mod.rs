//! Audit metadata policy.
//!
//! # Responsibility
//! - Compute provenance mutations (timestamps, actors, version) for pending
//!   creates, updates and deletes.
//! - Turn physical deletes of soft-deletable records into tombstone updates.
//!
//! # Invariants
//! - The visitor is pure apart from reading its clock.
//! - Version bumps only accompany writes with an acting identity.

pub mod clock;
pub mod visitor;
