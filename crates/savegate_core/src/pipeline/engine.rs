//! Storage engine collaborator contract.

use crate::model::change::{ChangeSet, PendingChange};

/// Persistence backend intercepted by [`SaveInterceptor`].
///
/// The engine owns staging; the interceptor only works on copies until the
/// engine accepts a change set in `apply_changes`.
///
/// [`SaveInterceptor`]: crate::pipeline::orchestrator::SaveInterceptor
pub trait StorageEngine {
    type Record;
    type Error;

    /// Changes about to be committed, in stable staging order.
    ///
    /// Staged state must stay untouched until `apply_changes` succeeds.
    fn pending_changes(&self) -> Vec<PendingChange<Self::Record>>;

    /// Physically persists a (possibly rewritten) change set and clears the
    /// staged changes it covers.
    fn apply_changes(&mut self, changes: ChangeSet<Self::Record>) -> Result<(), Self::Error>;
}
