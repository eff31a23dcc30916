//! Immutable identity snapshots of domain entities.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::EntityId;

/// Self-contained identity of an entity, taken by value at event
/// construction time.
///
/// `id` and `type_tag` together identify the originating entity. `label` is
/// a denormalized display string and is allowed to go stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntitySnapshot {
    /// Identifier of the entity.
    pub id: EntityId,
    /// Concrete type name of the entity (e.g. `User`, `Post`).
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Human-readable label at snapshot time.
    pub label: String,
}

impl EntitySnapshot {
    /// Create a snapshot from its parts.
    pub fn new(id: impl Into<EntityId>, type_tag: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
            label: label.into(),
        }
    }
}
