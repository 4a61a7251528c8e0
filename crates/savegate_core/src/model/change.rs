//! Pending change model.
//!
//! # Responsibility
//! - Represent one staged create/update/delete produced by a storage engine.
//! - Carry the capability flags evaluated when the change was staged.
//!
//! # Invariants
//! - A change set is owned by exactly one in-flight commit.
//! - Iteration order is the storage engine's staging order; nothing reorders it.
//! - The only kind rewrite allowed is `Delete -> Update` (soft delete).

use crate::model::entity::{Capabilities, Facets, Record};
use std::fmt::{Display, Formatter};

/// Operation kind of one pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Operation name used in violation reports.
    pub fn operation(self) -> &'static str {
        match self {
            Self::Insert => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.operation())
    }
}

/// One staged mutation for the current commit attempt.
#[derive(Debug, Clone)]
pub struct PendingChange<R> {
    record: R,
    kind: ChangeKind,
    capabilities: Capabilities,
    /// Audit version the record carried when staged; `None` for unaudited records.
    loaded_version: Option<u64>,
    rewritten_from: Option<ChangeKind>,
}

impl<R> PendingChange<R> {
    /// Stages `record` for `kind`, evaluating its capabilities once.
    pub fn new<A>(mut record: R, kind: ChangeKind) -> Self
    where
        R: Record<A>,
    {
        let facets = record.facets();
        let capabilities = facets.capabilities();
        let loaded_version = match facets {
            Facets::Tracked {
                audit: Some(audit), ..
            } => Some(audit.version),
            _ => None,
        };

        Self {
            record,
            kind,
            capabilities,
            loaded_version,
            rewritten_from: None,
        }
    }

    /// Replaces the staged record and kind for the same key.
    ///
    /// Capabilities are re-evaluated; `loaded_version` stays the one captured
    /// when the key was first staged, so a later edit of the same record is
    /// still checked against what storage held.
    pub fn restage<A>(&mut self, record: R, kind: ChangeKind)
    where
        R: Record<A>,
    {
        let loaded_version = self.loaded_version;
        *self = Self::new(record, kind);
        self.loaded_version = loaded_version;
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn loaded_version(&self) -> Option<u64> {
        self.loaded_version
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn into_record(self) -> R {
        self.record
    }

    /// Kind this change had before a rewrite, if any.
    pub fn rewritten_from(&self) -> Option<ChangeKind> {
        self.rewritten_from
    }

    /// Whether this change is a delete that was turned into an update.
    pub fn is_soft_delete(&self) -> bool {
        self.rewritten_from == Some(ChangeKind::Delete) && self.kind == ChangeKind::Update
    }

    /// Rewrites the operation kind in place.
    ///
    /// Returns `false` and leaves the change untouched when the current kind
    /// is not `from`.
    pub fn rewrite(&mut self, from: ChangeKind, to: ChangeKind) -> bool {
        if self.kind != from {
            return false;
        }
        if from != to {
            self.rewritten_from = Some(from);
            self.kind = to;
        }
        true
    }
}

/// Ordered, commit-owned list of pending changes.
#[derive(Debug, Clone)]
pub struct ChangeSet<R> {
    changes: Vec<PendingChange<R>>,
}

impl<R> Default for ChangeSet<R> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<R> ChangeSet<R> {
    pub fn new(changes: Vec<PendingChange<R>>) -> Self {
        Self { changes }
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PendingChange<R>> {
        self.changes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PendingChange<R>> {
        self.changes.iter_mut()
    }

    /// Rewrites the kind of the change at `index`; `false` when out of range
    /// or the kind does not match `from`.
    pub fn rewrite(&mut self, index: usize, from: ChangeKind, to: ChangeKind) -> bool {
        self.changes
            .get_mut(index)
            .is_some_and(|change| change.rewrite(from, to))
    }

    pub fn into_changes(self) -> Vec<PendingChange<R>> {
        self.changes
    }
}

impl<R> IntoIterator for ChangeSet<R> {
    type Item = PendingChange<R>;
    type IntoIter = std::vec::IntoIter<PendingChange<R>>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<R> FromIterator<PendingChange<R>> for ChangeSet<R> {
    fn from_iter<T: IntoIterator<Item = PendingChange<R>>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
