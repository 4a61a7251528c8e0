//! Reference storage engine.
//!
//! # Responsibility
//! - Implement `StorageEngine` over SQLite so the save pipeline can be used
//!   end to end.
//! - Provide typed lookups that honor soft-delete tombstones.
//!
//! # Invariants
//! - Staged changes survive a rejected or failed commit.
//! - Updates are guarded by the version loaded at staging time.

pub mod record_store;
