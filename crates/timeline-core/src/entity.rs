//! The boundary between the pipeline and the domain model.
//!
//! The pipeline never sees domain rows directly. Anything that can appear as
//! an actor, object or target implements [`Entity`], which exposes the three
//! values a snapshot needs. Accessors are fallible because domain models
//! often load them lazily.

use timeline_types::{EntityId, EntitySnapshot};

/// Failure reading a value off a domain entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The entity has no value for `field`.
    #[error("missing value for {field}")]
    Missing {
        /// Name of the field or accessor.
        field: String,
    },

    /// The value for `field` exists but cannot be used.
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Name of the field or accessor.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The backing data could not be loaded.
    #[error("entity data unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },
}

impl AccessError {
    /// Shorthand for [`AccessError::Missing`].
    pub fn missing(field: impl Into<String>) -> Self {
        Self::Missing {
            field: field.into(),
        }
    }

    /// Shorthand for [`AccessError::Invalid`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// A live domain entity that can be snapshotted into an event.
pub trait Entity: Send + Sync {
    /// Identifier of the entity.
    fn id(&self) -> Result<EntityId, AccessError>;

    /// Concrete type name, written as the snapshot's `type`.
    ///
    /// [`type_tag_of`] derives it from the Rust type name.
    fn type_tag(&self) -> &str;

    /// Human-readable display string.
    fn label(&self) -> Result<String, AccessError>;
}

/// Last path segment of `T`'s type name (`my_app::models::User` -> `User`).
pub fn type_tag_of<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    // Generic arguments may contain `::` themselves; cut them off first.
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Snapshots are entities too, so already-denormalized references (from a
/// message queue, a cache) can go through the same pipeline.
impl Entity for EntitySnapshot {
    fn id(&self) -> Result<EntityId, AccessError> {
        Ok(self.id.clone())
    }

    fn type_tag(&self) -> &str {
        &self.type_tag
    }

    fn label(&self) -> Result<String, AccessError> {
        Ok(self.label.clone())
    }
}
