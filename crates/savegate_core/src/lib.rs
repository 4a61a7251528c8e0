//! Save-time interception for persisted records.
//!
//! Every commit passes through one pipeline that vetoes writes inside
//! read-only scopes or against read-only record types, stamps audit
//! metadata, and turns deletes of deletable records into tombstone updates,
//! independent of the storage engine underneath.

pub mod audit;
pub mod db;
pub mod error;
pub mod guard;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod repo;
pub mod service;

pub use audit::clock::{Clock, FixedClock, SystemClock};
pub use audit::visitor::{AuditOutcome, AuditVisitor};
pub use error::{SaveError, SaveResult};
pub use guard::scope::{ReadOnlyScope, ReadOnlyScopeGuard};
pub use logging::{
    default_log_level, flush_logging, init_logging, logging_status, LogConfig, LoggingError,
};
pub use model::change::{ChangeKind, ChangeSet, PendingChange};
pub use model::entity::{AuditMetadata, Capabilities, Entity, EpochMillis, Facets, Record};
pub use pipeline::engine::StorageEngine;
pub use pipeline::orchestrator::{CommitPhase, CommitReport, SaveContext, SaveInterceptor};
pub use repo::record_store::{RecordListQuery, SqliteRecordStore, StoreError, StoreResult};
pub use service::session::AuditedSession;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
