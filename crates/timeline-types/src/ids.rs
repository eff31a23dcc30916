//! Opaque entity identifiers.
//!
//! Domain models identify their rows either by integer primary keys or by
//! string/UUID keys. [`EntityId`] carries either form unchanged so that an
//! identifier written into a feed decodes back to exactly the value that was
//! snapshotted.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Identifier of a domain entity at snapshot time.
///
/// Serialized untagged: integers as JSON numbers, everything else as JSON
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export, export_to = "bindings/")]
pub enum EntityId {
    /// Integer primary key.
    Int(i64),
    /// String key (slugs, UUIDs, external ids).
    Text(String),
}

impl EntityId {
    /// Parse an identifier read back from the store.
    ///
    /// Store relations hold members as strings; anything that parses as an
    /// `i64` becomes [`EntityId::Int`], everything else stays text.
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map_or_else(|_| Self::Text(raw.to_owned()), Self::Int)
    }

    /// Whether the identifier is usable inside a log key.
    ///
    /// Empty text ids and ids containing whitespace would produce keys that
    /// collide or cannot be typed at a `redis-cli` prompt.
    pub fn is_key_safe(&self) -> bool {
        match self {
            Self::Int(_) => true,
            Self::Text(s) => !s.is_empty() && !s.chars().any(char::is_whitespace),
        }
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self::Text(id)
    }
}

impl From<Uuid> for EntityId {
    fn from(id: Uuid) -> Self {
        Self::Text(id.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_integers() {
        assert_eq!(EntityId::parse("42"), EntityId::Int(42));
        assert_eq!(EntityId::parse("-7"), EntityId::Int(-7));
        assert_eq!(EntityId::parse("alice"), EntityId::Text("alice".to_owned()));
    }

    #[test]
    fn json_keeps_the_original_form() {
        let int = serde_json::to_string(&EntityId::Int(5)).unwrap();
        assert_eq!(int, "5");

        // A numeric-looking string must stay a string.
        let text: EntityId = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(text, EntityId::Text("5".to_owned()));

        let back: EntityId = serde_json::from_str(&int).unwrap();
        assert_eq!(back, EntityId::Int(5));
    }

    #[test]
    fn uuid_ids_are_text() {
        let uuid = Uuid::now_v7();
        let id = EntityId::from(uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn key_safety() {
        assert!(EntityId::Int(0).is_key_safe());
        assert!(EntityId::from("u-1").is_key_safe());
        assert!(!EntityId::from("").is_key_safe());
        assert!(!EntityId::from("a b").is_key_safe());
    }
}
