//! Typed failures of a commit attempt.
//!
//! # Invariants
//! - Every variant aborts the whole commit; nothing is partially applied.
//! - Storage engine errors are carried unmodified in `Storage`.

use crate::model::change::ChangeKind;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SaveResult<T, E> = Result<T, SaveError<E>>;

/// Save pipeline error, generic over the storage engine error `E`.
#[derive(Debug)]
pub enum SaveError<E> {
    /// Writes were staged while a read-only scope was active.
    ReadOnlyScope { pending: usize },
    /// A read-only record type was staged for a write.
    ReadOnlyEntity {
        entity_type: &'static str,
        operation: ChangeKind,
    },
    /// No live (non-deleted) record matched a lookup by id.
    NotFound { entity_type: String, id: String },
    /// Failure reported by the storage engine.
    Storage(E),
}

impl<E> SaveError<E> {
    pub fn not_found(entity_type: impl Into<String>, id: impl Display) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadOnlyScope { .. } => "read_only_scope_violation",
            Self::ReadOnlyEntity { .. } => "read_only_entity_violation",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage_error",
        }
    }

    pub fn storage(&self) -> Option<&E> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl<E: Display> Display for SaveError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadOnlyScope { pending } => write!(
                f,
                "cannot save {pending} pending change(s) inside a read-only scope"
            ),
            Self::ReadOnlyEntity {
                entity_type,
                operation,
            } => write!(f, "cannot {operation} read-only entity `{entity_type}`"),
            Self::NotFound { entity_type, id } => {
                write!(f, "{entity_type} not found: {id}")
            }
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl<E: Error + 'static> Error for SaveError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            Self::ReadOnlyScope { .. } | Self::ReadOnlyEntity { .. } | Self::NotFound { .. } => {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SaveError;
    use crate::model::change::ChangeKind;
    use std::error::Error;
    use std::fmt::{Display, Formatter};

    #[derive(Debug)]
    struct DiskFull;

    impl Display for DiskFull {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            write!(f, "disk full")
        }
    }

    impl Error for DiskFull {}

    #[test]
    fn read_only_entity_message_names_type_and_operation() {
        let err: SaveError<DiskFull> = SaveError::ReadOnlyEntity {
            entity_type: "legacy_customer",
            operation: ChangeKind::Insert,
        };
        assert_eq!(err.to_string(), "cannot create read-only entity `legacy_customer`");
        assert_eq!(err.code(), "read_only_entity_violation");
    }

    #[test]
    fn not_found_carries_type_and_id() {
        let err: SaveError<DiskFull> = SaveError::not_found("product", 42);
        assert_eq!(err.to_string(), "product not found: 42");
    }

    #[test]
    fn storage_error_is_passed_through_as_source() {
        let err = SaveError::Storage(DiskFull);
        assert_eq!(err.to_string(), "disk full");
        assert!(err.source().is_some());
        assert!(err.storage().is_some());
    }
}
