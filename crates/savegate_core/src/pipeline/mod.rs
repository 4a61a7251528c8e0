//! Save-time change interception.
//!
//! # Responsibility
//! - Define the storage engine collaborator contract.
//! - Drive one commit attempt: guard, audit, then hand the rewritten change
//!   set back to the engine.
//!
//! # Invariants
//! - Guards run before any audit mutation.
//! - The engine is never asked to persist a rejected change set.
//! - Engine failures surface unmodified; nothing is retried.

pub mod engine;
pub mod orchestrator;
