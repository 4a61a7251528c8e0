//! Always-on veto for read-only record types.

use crate::error::SaveError;
use crate::model::change::PendingChange;
use crate::model::entity::Entity;

/// Fails when the change targets a read-only record type, whatever its kind.
pub fn check_writable<R: Entity, E>(change: &PendingChange<R>) -> Result<(), SaveError<E>> {
    if change.capabilities().read_only {
        return Err(SaveError::ReadOnlyEntity {
            entity_type: change.record().entity_type(),
            operation: change.kind(),
        });
    }
    Ok(())
}

/// Returns the first offending change in staging order, if any.
pub fn first_violation<'a, R: Entity, E>(
    changes: impl IntoIterator<Item = &'a PendingChange<R>>,
) -> Option<SaveError<E>>
where
    R: 'a,
{
    changes
        .into_iter()
        .find_map(|change| check_writable(change).err())
}
