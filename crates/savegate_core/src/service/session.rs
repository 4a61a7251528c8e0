//! Audited unit of work over the SQLite record store.
//!
//! # Responsibility
//! - Stage record writes and commit them through `SaveInterceptor`.
//! - Expose read-only scope entry for query-only code paths.
//!
//! # Invariants
//! - Every write goes through the interceptor; the session never calls
//!   `apply_changes` directly.
//! - A rejected or failed `save_changes` keeps staged changes so the caller
//!   can retry or discard them.

use crate::audit::clock::{Clock, SystemClock};
use crate::error::{SaveError, SaveResult};
use crate::guard::scope::{ReadOnlyScope, ReadOnlyScopeGuard};
use crate::model::entity::Record;
use crate::pipeline::orchestrator::{CommitReport, SaveContext, SaveInterceptor};
use crate::repo::record_store::{RecordListQuery, SqliteRecordStore, StoreError};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// One logical unit of work (for example one request) against a connection.
pub struct AuditedSession<'conn, R, A, C = SystemClock> {
    store: SqliteRecordStore<'conn, R, A>,
    interceptor: SaveInterceptor<C>,
    context: SaveContext<A>,
}

impl<'conn, R, A> AuditedSession<'conn, R, A, SystemClock>
where
    R: Record<A> + Serialize + DeserializeOwned + Clone,
    A: Clone,
{
    /// Creates a session acting as `actor` (`None` for system writes).
    pub fn new(conn: &'conn Connection, actor: Option<A>) -> Self {
        Self::with_parts(conn, SaveInterceptor::new(), SaveContext::new(actor))
    }
}

impl<'conn, R, A, C> AuditedSession<'conn, R, A, C>
where
    R: Record<A> + Serialize + DeserializeOwned + Clone,
    A: Clone,
    C: Clock,
{
    pub fn with_parts(
        conn: &'conn Connection,
        interceptor: SaveInterceptor<C>,
        context: SaveContext<A>,
    ) -> Self {
        Self {
            store: SqliteRecordStore::new(conn),
            interceptor,
            context,
        }
    }

    pub fn actor(&self) -> Option<&A> {
        self.context.actor()
    }

    /// Switches the acting identity for subsequent commits.
    pub fn set_actor(&mut self, actor: Option<A>) {
        self.context.set_actor(actor);
    }

    /// Scope handle shared with anything else in this unit of work.
    pub fn read_only_scope(&self) -> &ReadOnlyScope {
        self.context.read_only_scope()
    }

    /// Forbids all writes from this session until the guard is released.
    #[must_use = "the read-only scope closes as soon as the guard is dropped"]
    pub fn enter_read_only(&self) -> ReadOnlyScopeGuard {
        self.context.enter_read_only()
    }

    pub fn add(&mut self, record: R) {
        self.store.add(record);
    }

    pub fn update(&mut self, record: R) {
        self.store.update(record);
    }

    pub fn remove(&mut self, record: R) {
        self.store.remove(record);
    }

    pub fn pending_len(&self) -> usize {
        self.store.staged_len()
    }

    pub fn discard_pending(&mut self) {
        self.store.discard_staged();
    }

    /// Commits staged changes through the interceptor.
    pub fn save_changes(&mut self) -> SaveResult<CommitReport, StoreError> {
        self.interceptor.commit(&mut self.store, &self.context)
    }

    pub fn get(
        &self,
        entity_type: &str,
        id: &R::Id,
        include_deleted: bool,
    ) -> SaveResult<Option<R>, StoreError> {
        self.store
            .get(entity_type, id, include_deleted)
            .map_err(SaveError::Storage)
    }

    /// Loads a live record or fails with `NotFound`.
    pub fn find_live(&self, entity_type: &str, id: &R::Id) -> SaveResult<R, StoreError> {
        self.store.find_live(entity_type, id)
    }

    pub fn list(&self, query: &RecordListQuery) -> SaveResult<Vec<R>, StoreError> {
        self.store.list(query).map_err(SaveError::Storage)
    }
}
