//! Recipient logs and their store keys.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `global:activity` | List | Shared feed of every event |
//! | `user:id:{id}:activity` | List | Feed received by a user |
//! | `user:id:{id}:posts` | List | Activity authored by a user |
//! | `user:id:{id}:{relation}` | Set | Relation members (e.g. `followers`) |
//!
//! The `user` scope, the global key and both feed names are configurable
//! through [`KeyScheme`].

use serde::Deserialize;

use crate::ids::EntityId;

/// One log an event is appended to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// The shared global feed.
    Global,
    /// The feed received by a user (the actor itself or a follower).
    Activity(EntityId),
    /// The log of activity authored by a user.
    Posts(EntityId),
}

impl Recipient {
    /// Store key of this recipient's log under `scheme`.
    pub fn key(&self, scheme: &KeyScheme) -> String {
        match self {
            Self::Global => scheme.global.clone(),
            Self::Activity(id) => scheme.user_key(id, &scheme.activity_feed),
            Self::Posts(id) => scheme.user_key(id, &scheme.posts_feed),
        }
    }
}

/// The logs one event fans out to. Computed per event, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipientSet {
    recipients: Vec<Recipient>,
}

impl RecipientSet {
    /// Wrap an already-ordered recipient list.
    pub const fn new(recipients: Vec<Recipient>) -> Self {
        Self { recipients }
    }

    /// Number of recipient logs.
    pub const fn len(&self) -> usize {
        self.recipients.len()
    }

    /// Whether there are no recipients.
    pub const fn is_empty(&self) -> bool {
        self.recipients.is_empty()
    }

    /// Whether `recipient` is part of the set.
    pub fn contains(&self, recipient: &Recipient) -> bool {
        self.recipients.contains(recipient)
    }

    /// Iterate recipients in resolution order.
    pub fn iter(&self) -> core::slice::Iter<'_, Recipient> {
        self.recipients.iter()
    }
}

impl<'a> IntoIterator for &'a RecipientSet {
    type Item = &'a Recipient;
    type IntoIter = core::slice::Iter<'a, Recipient>;

    fn into_iter(self) -> Self::IntoIter {
        self.recipients.iter()
    }
}

/// Naming of log and relation keys in the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyScheme {
    /// Prefix of per-user keys.
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Key of the shared global feed.
    #[serde(default = "default_global")]
    pub global: String,

    /// Feed name for activity received by a user.
    #[serde(default = "default_activity_feed")]
    pub activity_feed: String,

    /// Feed name for activity authored by a user.
    #[serde(default = "default_posts_feed")]
    pub posts_feed: String,
}

impl KeyScheme {
    /// Key of a per-user list or set: `{scope}:id:{id}:{name}`.
    pub fn user_key(&self, id: &EntityId, name: &str) -> String {
        format!("{}:id:{id}:{name}", self.scope)
    }

    /// Key of the relation set `relation` attached to `id`.
    pub fn relation_key(&self, id: &EntityId, relation: &str) -> String {
        self.user_key(id, relation)
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self {
            scope: default_scope(),
            global: default_global(),
            activity_feed: default_activity_feed(),
            posts_feed: default_posts_feed(),
        }
    }
}

fn default_scope() -> String {
    "user".to_owned()
}

fn default_global() -> String {
    "global:activity".to_owned()
}

fn default_activity_feed() -> String {
    "activity".to_owned()
}

fn default_posts_feed() -> String {
    "posts".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys() {
        let scheme = KeyScheme::default();
        let id = EntityId::Int(7);
        assert_eq!(Recipient::Global.key(&scheme), "global:activity");
        assert_eq!(Recipient::Activity(id.clone()).key(&scheme), "user:id:7:activity");
        assert_eq!(Recipient::Posts(id.clone()).key(&scheme), "user:id:7:posts");
        assert_eq!(scheme.relation_key(&id, "followers"), "user:id:7:followers");
    }

    #[test]
    fn custom_scope() {
        let scheme = KeyScheme {
            scope: "member".to_owned(),
            global: "feed:all".to_owned(),
            activity_feed: "inbox".to_owned(),
            posts_feed: "outbox".to_owned(),
        };
        let id = EntityId::from("ada");
        assert_eq!(Recipient::Global.key(&scheme), "feed:all");
        assert_eq!(Recipient::Activity(id.clone()).key(&scheme), "member:id:ada:inbox");
        assert_eq!(Recipient::Posts(id).key(&scheme), "member:id:ada:outbox");
    }

    #[test]
    fn set_preserves_order() {
        let set = RecipientSet::new(vec![
            Recipient::Global,
            Recipient::Activity(EntityId::Int(1)),
            Recipient::Posts(EntityId::Int(1)),
        ]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().next(), Some(&Recipient::Global));
        assert!(set.contains(&Recipient::Posts(EntityId::Int(1))));
        assert!(!set.contains(&Recipient::Posts(EntityId::Int(2))));
    }
}
