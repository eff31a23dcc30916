//! Shared value types for the Timeline activity fan-out pipeline.
//!
//! These are the values that cross crate and process boundaries: the
//! snapshots and events written into feeds, and the recipient keys they are
//! written under. Feed payload types are exported to `TypeScript` via `ts-rs`
//! for feed-reading consumers.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque entity identifiers
//! - [`snapshot`] -- Immutable entity identity snapshots
//! - [`scalar`] -- Scalar values for the `extra` map
//! - [`event`] -- The canonical activity record and its encoding
//! - [`recipient`] -- Recipient logs and key naming

pub mod event;
pub mod ids;
pub mod recipient;
pub mod scalar;
pub mod snapshot;

// Re-export all public types at crate root for convenience.
pub use event::{ActivityEvent, EncodedEvent};
pub use ids::EntityId;
pub use recipient::{KeyScheme, Recipient, RecipientSet};
pub use scalar::Scalar;
pub use snapshot::EntitySnapshot;
