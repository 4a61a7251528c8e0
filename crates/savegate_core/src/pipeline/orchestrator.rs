//! Change-set orchestrator.
//!
//! # Responsibility
//! - Run one commit attempt through
//!   `requested -> guarding -> auditing -> persisting -> committed|rejected`.
//! - Thread actor identity and read-only scope explicitly via `SaveContext`.
//!
//! # Invariants
//! - An active read-only scope rejects any non-empty change set before
//!   per-record inspection.
//! - The first read-only record in staging order decides the rejection.
//! - Audit mutations are applied to working copies only; the engine sees
//!   them only when every guard passed.
//!
//! # See also
//! - `crate::pipeline::engine::StorageEngine`

use crate::audit::clock::{Clock, SystemClock};
use crate::audit::visitor::{AuditOutcome, AuditVisitor};
use crate::error::{SaveError, SaveResult};
use crate::guard::entity::first_violation;
use crate::guard::scope::{ReadOnlyScope, ReadOnlyScopeGuard};
use crate::model::change::{ChangeKind, ChangeSet};
use crate::model::entity::Record;
use crate::pipeline::engine::StorageEngine;
use log::{debug, error, info, warn};
use std::fmt::Display;
use std::time::Instant;

/// Ambient state of one logical unit of work.
#[derive(Debug, Clone)]
pub struct SaveContext<A> {
    actor: Option<A>,
    read_only: ReadOnlyScope,
}

impl<A> SaveContext<A> {
    /// Context with its own, initially inactive read-only scope.
    pub fn new(actor: Option<A>) -> Self {
        Self::with_scope(actor, ReadOnlyScope::new())
    }

    /// System/anonymous context.
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// Context joining an existing unit of work's scope.
    pub fn with_scope(actor: Option<A>, read_only: ReadOnlyScope) -> Self {
        Self { actor, read_only }
    }

    pub fn actor(&self) -> Option<&A> {
        self.actor.as_ref()
    }

    pub fn set_actor(&mut self, actor: Option<A>) {
        self.actor = actor;
    }

    pub fn read_only_scope(&self) -> &ReadOnlyScope {
        &self.read_only
    }

    /// Marks this unit of work read-only until the guard is released.
    #[must_use = "the read-only scope closes as soon as the guard is dropped"]
    pub fn enter_read_only(&self) -> ReadOnlyScopeGuard {
        self.read_only.enter()
    }
}

/// State of one commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPhase {
    Requested,
    Guarding,
    Auditing,
    Persisting,
    Committed,
    Rejected,
}

impl CommitPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Guarding => "guarding",
            Self::Auditing => "auditing",
            Self::Persisting => "persisting",
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Rejected)
    }
}

/// Summary of a successful commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommitReport {
    pub inserted: usize,
    pub updated: usize,
    pub soft_deleted: usize,
    /// Deletes of records without a tombstone flag, removed physically.
    pub deleted: usize,
}

impl CommitReport {
    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.soft_deleted + self.deleted
    }
}

/// Intercepts commits to enforce read-only policies and stamp audit metadata.
#[derive(Debug, Clone, Default)]
pub struct SaveInterceptor<C = SystemClock> {
    visitor: AuditVisitor<C>,
}

impl SaveInterceptor<SystemClock> {
    pub fn new() -> Self {
        Self {
            visitor: AuditVisitor::new(),
        }
    }
}

impl<C: Clock> SaveInterceptor<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            visitor: AuditVisitor::with_clock(clock),
        }
    }

    pub fn visitor(&self) -> &AuditVisitor<C> {
        &self.visitor
    }

    /// Commits the engine's pending changes under `ctx`.
    ///
    /// # Errors
    /// - `ReadOnlyScope` when `ctx` is inside a read-only scope and at least
    ///   one change is pending.
    /// - `ReadOnlyEntity` for the first staged change on a read-only type.
    /// - `Storage` with the engine's error when persisting fails.
    pub fn commit<E, A>(
        &self,
        engine: &mut E,
        ctx: &SaveContext<A>,
    ) -> SaveResult<CommitReport, E::Error>
    where
        E: StorageEngine,
        E::Record: Record<A>,
        E::Error: Display,
        A: Clone,
    {
        let started_at = Instant::now();
        let mut phase = CommitPhase::Requested;
        let mut changes = ChangeSet::new(engine.pending_changes());
        debug!(
            "event=commit module=pipeline phase={} pending={}",
            phase.as_str(),
            changes.len()
        );

        if changes.is_empty() {
            debug!("event=commit module=pipeline phase=committed pending=0 status=noop");
            return Ok(CommitReport::default());
        }

        phase = transition(phase, CommitPhase::Guarding);
        if let Err(err) = self.guard(&changes, ctx) {
            transition(phase, CommitPhase::Rejected);
            warn!(
                "event=commit module=pipeline status=rejected error_code={} duration_ms={}",
                err.code(),
                started_at.elapsed().as_millis()
            );
            return Err(err);
        }

        phase = transition(phase, CommitPhase::Auditing);
        let report = self.audit(&mut changes, ctx.actor());

        phase = transition(phase, CommitPhase::Persisting);
        if let Err(err) = engine.apply_changes(changes) {
            transition(phase, CommitPhase::Rejected);
            error!(
                "event=commit module=pipeline status=error error_code=storage_error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(SaveError::Storage(err));
        }

        transition(phase, CommitPhase::Committed);
        info!(
            "event=commit module=pipeline status=ok inserted={} updated={} soft_deleted={} deleted={} duration_ms={}",
            report.inserted,
            report.updated,
            report.soft_deleted,
            report.deleted,
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Runs the scope guard, then the per-type guard, without mutating
    /// anything.
    pub fn guard<R, A, E>(
        &self,
        changes: &ChangeSet<R>,
        ctx: &SaveContext<A>,
    ) -> SaveResult<(), E>
    where
        R: Record<A>,
    {
        if ctx.read_only_scope().is_active() && !changes.is_empty() {
            return Err(SaveError::ReadOnlyScope {
                pending: changes.len(),
            });
        }

        match first_violation(changes.iter()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Applies audit metadata to every change, rewriting soft deletes in place.
    pub fn audit<R, A>(&self, changes: &mut ChangeSet<R>, actor: Option<&A>) -> CommitReport
    where
        R: Record<A>,
        A: Clone,
    {
        let mut report = CommitReport::default();
        for change in changes.iter_mut() {
            let outcome = self.visitor.visit(change, actor);
            match (outcome, change.kind()) {
                (AuditOutcome::SoftDeleted, _) => report.soft_deleted += 1,
                (_, ChangeKind::Insert) => report.inserted += 1,
                (_, ChangeKind::Update) => report.updated += 1,
                (_, ChangeKind::Delete) => report.deleted += 1,
            }
        }
        report
    }
}

fn transition(from: CommitPhase, to: CommitPhase) -> CommitPhase {
    debug!(
        "event=commit_phase module=pipeline from={} to={}",
        from.as_str(),
        to.as_str()
    );
    to
}
