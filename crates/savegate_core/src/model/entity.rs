//! Entity capability contracts.
//!
//! # Responsibility
//! - Define the identity contract shared by every persisted record.
//! - Expose audit metadata and the soft-delete flag through one tagged union,
//!   so callers query capabilities once instead of probing types repeatedly.
//!
//! # Invariants
//! - `created_on <= modified_on` for every audited record.
//! - `version` starts at 0 and only moves forward by 1 per attributed write.
//! - `created_by` is assigned at most once.
//! - `synchronized_on` belongs to external sync processes and is never
//!   written by the save pipeline.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

/// UTC Unix epoch milliseconds.
pub type EpochMillis = i64;

/// Identity contract for every persisted record.
///
/// `Id` is independent of the actor identity type used in audit metadata.
pub trait Entity {
    type Id: Clone + Eq + Display + Debug;

    /// Stable record identifier.
    fn id(&self) -> &Self::Id;

    /// Stable type name used in storage keys and error reports.
    fn entity_type(&self) -> &'static str;
}

/// Provenance metadata attached to auditable records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata<A> {
    pub created_on: EpochMillis,
    pub modified_on: EpochMillis,
    pub created_by: Option<A>,
    pub modified_by: Option<A>,
    pub version: u64,
    /// Set by external sync jobs only.
    pub synchronized_on: Option<EpochMillis>,
}

impl<A> Default for AuditMetadata<A> {
    fn default() -> Self {
        Self {
            created_on: 0,
            modified_on: 0,
            created_by: None,
            modified_by: None,
            version: 0,
            synchronized_on: None,
        }
    }
}

/// Mutable view over the capabilities a record participates in.
///
/// Returned by [`Record::facets`]. Field borrows are disjoint, so a tracked
/// record can hand out its audit metadata and its tombstone flag at once.
pub enum Facets<'a, A> {
    /// Mirrored or legacy data: identity only, never writable.
    ReadOnly,
    Tracked {
        audit: Option<&'a mut AuditMetadata<A>>,
        deleted: Option<&'a mut bool>,
    },
}

impl<'a, A> Facets<'a, A> {
    /// Tracked record that is both auditable and soft-deletable.
    pub fn audited(audit: &'a mut AuditMetadata<A>, deleted: &'a mut bool) -> Self {
        Self::Tracked {
            audit: Some(audit),
            deleted: Some(deleted),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::ReadOnly => Capabilities::READ_ONLY,
            Self::Tracked { audit, deleted } => Capabilities {
                read_only: false,
                auditable: audit.is_some(),
                deletable: deleted.is_some(),
            },
        }
    }
}

/// A record the save pipeline can intercept, audited by actor type `A`.
pub trait Record<A>: Entity {
    fn facets(&mut self) -> Facets<'_, A>;
}

/// Capability flags evaluated once per pending change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub read_only: bool,
    pub auditable: bool,
    pub deletable: bool,
}

impl Capabilities {
    pub const READ_ONLY: Self = Self {
        read_only: true,
        auditable: false,
        deletable: false,
    };
}

#[cfg(test)]
mod tests {
    use super::{AuditMetadata, Capabilities, Facets};

    #[test]
    fn default_metadata_starts_unversioned_and_unattributed() {
        let metadata: AuditMetadata<u32> = AuditMetadata::default();
        assert_eq!(metadata.version, 0);
        assert!(metadata.created_by.is_none());
        assert!(metadata.modified_by.is_none());
        assert!(metadata.synchronized_on.is_none());
    }

    #[test]
    fn read_only_facets_expose_no_write_capabilities() {
        let facets: Facets<'_, u32> = Facets::ReadOnly;
        assert_eq!(facets.capabilities(), Capabilities::READ_ONLY);
    }

    #[test]
    fn tracked_facets_report_present_fields() {
        let mut deleted = false;
        let facets: Facets<'_, u32> = Facets::Tracked {
            audit: None,
            deleted: Some(&mut deleted),
        };
        let caps = facets.capabilities();
        assert!(!caps.read_only);
        assert!(!caps.auditable);
        assert!(caps.deletable);
    }
}
