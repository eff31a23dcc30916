//! Entity references to immutable snapshots.

use timeline_types::EntitySnapshot;

use crate::entity::{AccessError, Entity};

/// Position an entity takes in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The entity performing the action.
    Actor,
    /// The entity acted upon.
    Object,
    /// The optional entity the action was directed toward.
    Target,
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Actor => "actor",
            Self::Object => "object",
            Self::Target => "target",
        })
    }
}

/// Snapshot `entity`, or nothing if there is no entity.
///
/// Values are copied out at call time; the returned snapshot holds no
/// reference to `entity`.
///
/// # Errors
///
/// Returns the [`AccessError`] of the first accessor that fails.
pub fn snapshot(entity: Option<&dyn Entity>) -> Result<Option<EntitySnapshot>, AccessError> {
    entity.map(snapshot_of).transpose()
}

/// Snapshot a present entity.
///
/// # Errors
///
/// Returns the [`AccessError`] of the first accessor that fails.
pub fn snapshot_of(entity: &dyn Entity) -> Result<EntitySnapshot, AccessError> {
    Ok(EntitySnapshot {
        id: entity.id()?,
        type_tag: entity.type_tag().to_owned(),
        label: entity.label()?,
    })
}
