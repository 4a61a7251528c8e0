//! Audit visitor: per-kind metadata policy for pending changes.
//!
//! # Invariants
//! - Insert stamps `created_on == modified_on` from one clock reading.
//! - `created_by` is only filled when still unset.
//! - Anonymous writes are timestamped but neither attributed nor versioned.
//! - Delete of a deletable record becomes an update with `is_deleted = true`
//!   and no version bump.

use crate::audit::clock::{Clock, SystemClock};
use crate::model::change::{ChangeKind, PendingChange};
use crate::model::entity::{AuditMetadata, Facets, Record};

/// Result of visiting one pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Record carries no capability relevant to this kind.
    Untouched,
    /// Audit metadata was stamped.
    Stamped,
    /// Delete was rewritten into a tombstone update.
    SoftDeleted,
}

/// Computes metadata mutations for pending changes.
#[derive(Debug, Clone, Default)]
pub struct AuditVisitor<C = SystemClock> {
    clock: C,
}

impl AuditVisitor<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> AuditVisitor<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Dispatches to the operation matching the change's current kind.
    pub fn visit<A, R>(&self, change: &mut PendingChange<R>, actor: Option<&A>) -> AuditOutcome
    where
        A: Clone,
        R: Record<A>,
    {
        match change.kind() {
            ChangeKind::Insert => self.on_insert(change.record_mut(), actor),
            ChangeKind::Update => self.on_update(change.record_mut(), actor),
            ChangeKind::Delete => self.on_delete(change, actor),
        }
    }

    /// Stamps a newly created record.
    pub fn on_insert<A, R>(&self, record: &mut R, actor: Option<&A>) -> AuditOutcome
    where
        A: Clone,
        R: Record<A>,
    {
        let Some(audit) = audit_of(record.facets()) else {
            return AuditOutcome::Untouched;
        };

        let now = self.clock.now_ms();
        audit.created_on = now;
        audit.modified_on = now;

        if let Some(actor) = actor {
            audit.modified_by = Some(actor.clone());
            if audit.created_by.is_none() {
                audit.created_by = Some(actor.clone());
            }
            audit.version += 1;
        }

        AuditOutcome::Stamped
    }

    /// Stamps a modified record. `created_*` fields are never touched.
    pub fn on_update<A, R>(&self, record: &mut R, actor: Option<&A>) -> AuditOutcome
    where
        A: Clone,
        R: Record<A>,
    {
        let Some(audit) = audit_of(record.facets()) else {
            return AuditOutcome::Untouched;
        };

        audit.modified_on = self.clock.now_ms();
        if let Some(actor) = actor {
            audit.modified_by = Some(actor.clone());
            audit.version += 1;
        }

        AuditOutcome::Stamped
    }

    /// Converts a delete of a deletable record into a tombstone update.
    ///
    /// Non-deletable records are left as physical deletes.
    pub fn on_delete<A, R>(&self, change: &mut PendingChange<R>, actor: Option<&A>) -> AuditOutcome
    where
        A: Clone,
        R: Record<A>,
    {
        if change.kind() != ChangeKind::Delete {
            return AuditOutcome::Untouched;
        }

        let Facets::Tracked {
            audit,
            deleted: Some(deleted),
        } = change.record_mut().facets()
        else {
            return AuditOutcome::Untouched;
        };

        *deleted = true;
        if let Some(audit) = audit {
            audit.modified_on = self.clock.now_ms();
            if let Some(actor) = actor {
                audit.modified_by = Some(actor.clone());
            }
        }

        change.rewrite(ChangeKind::Delete, ChangeKind::Update);
        AuditOutcome::SoftDeleted
    }
}

fn audit_of<A>(facets: Facets<'_, A>) -> Option<&mut AuditMetadata<A>> {
    match facets {
        Facets::Tracked { audit, .. } => audit,
        Facets::ReadOnly => None,
    }
}
