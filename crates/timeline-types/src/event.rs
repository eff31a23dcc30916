//! The canonical activity record and its storage encoding.
//!
//! An [`ActivityEvent`] is built once per triggering domain action and is
//! never mutated afterwards. Before fan-out it is encoded exactly once into
//! an [`EncodedEvent`]; every recipient log receives those same bytes.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "verb": "like",
//!   "actor":  { "id": 1, "type": "User", "label": "Ada" },
//!   "object": { "id": 9, "type": "Post", "label": "Hello" },
//!   "target": null,
//!   "extra": { "rating": 5 },
//!   "created_at": "2026-03-01T12:00:00.123456789Z"
//! }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::scalar::Scalar;
use crate::snapshot::EntitySnapshot;

/// "Actor performed verb on object, optionally toward target."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ActivityEvent {
    /// Short name of the action (e.g. `like`, `comment`).
    pub verb: String,
    /// Entity that performed the action.
    pub actor: EntitySnapshot,
    /// Entity the action was performed on.
    pub object: EntitySnapshot,
    /// Optional secondary entity the action was directed toward.
    #[serde(default)]
    pub target: Option<EntitySnapshot>,
    /// Extra scalar fields read off the triggering entity, keyed by name.
    /// Ordered by key, not by declaration, so every encoding of the same
    /// fields is byte-identical.
    #[serde(default)]
    pub extra: BTreeMap<String, Scalar>,
    /// Construction time. Authoritative for ordering within a feed.
    pub created_at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Serialize the event into its storage form.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if encoding fails.
    pub fn encode(&self) -> Result<EncodedEvent, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(EncodedEvent(Arc::from(json)))
    }

    /// Decode an event previously produced by [`ActivityEvent::encode`].
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if the payload is not a
    /// valid encoded event.
    pub fn decode(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// An encoded [`ActivityEvent`], shared by every append of one delivery.
///
/// Cloning is a reference-count bump; the bytes are never copied or
/// re-encoded per recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEvent(Arc<str>);

impl EncodedEvent {
    /// The encoded payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the payload is empty (never true for a real event).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for EncodedEvent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
