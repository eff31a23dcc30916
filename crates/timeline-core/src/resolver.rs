//! Recipient resolution.
//!
//! Every event goes to the global feed and to the actor's own activity and
//! posts logs. On top of that, each follower gets the event in their
//! activity log. Followers are read fresh for every event.

use std::collections::HashSet;

use timeline_store::{LogStore, StoreError};
use timeline_types::{EntityId, EntitySnapshot, KeyScheme, Recipient, RecipientSet};

use crate::entity::AccessError;

/// Errors raised while resolving recipients. No append has happened yet.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Reading the relation set from the store failed.
    #[error("failed to read relation {key}: {source}")]
    Store {
        /// Relation key that was read.
        key: String,
        /// The underlying store error.
        source: StoreError,
    },

    /// The caller-side followers accessor failed.
    #[error("followers accessor failed: {source}")]
    Access {
        /// The underlying accessor error.
        #[from]
        source: AccessError,
    },

    /// The actor's id cannot name a log.
    #[error("unusable actor id {actor:?}")]
    InvalidActor {
        /// The offending actor id.
        actor: String,
    },

    /// A relation member or follower id cannot name a log.
    #[error("unusable follower id {member:?} in {key}")]
    InvalidMember {
        /// Relation key (or `followers` for caller-supplied ids).
        key: String,
        /// The offending member.
        member: String,
    },
}

/// Where the actor's followers come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowerSource {
    /// The store-side relation set `{scope}:id:{actor}:{name}`.
    Relation(String),
    /// Follower ids already loaded by the caller.
    Fixed(Vec<EntityId>),
}

impl FollowerSource {
    /// The default `followers` relation.
    pub fn followers() -> Self {
        Self::Relation("followers".to_owned())
    }
}

impl Default for FollowerSource {
    fn default() -> Self {
        Self::followers()
    }
}

/// Computes the [`RecipientSet`] of an event.
#[derive(Debug, Clone)]
pub struct RecipientResolver {
    store: LogStore,
    keys: KeyScheme,
}

impl RecipientResolver {
    /// Resolver reading relations from `store`, naming logs with `keys`.
    pub const fn new(store: LogStore, keys: KeyScheme) -> Self {
        Self { store, keys }
    }

    /// The key scheme used for log and relation keys.
    pub const fn keys(&self) -> &KeyScheme {
        &self.keys
    }

    /// Resolve the recipients for an event by `actor`.
    ///
    /// The result is, in order: the global log, the actor's activity log,
    /// the actor's posts log, then one activity log per distinct follower.
    /// Followers whose log is already in the set (the actor following
    /// themselves, or ids rendering to the same key) are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] if the followers cannot be read or a
    /// follower id cannot be used in a key.
    pub async fn resolve(
        &self,
        actor: &EntitySnapshot,
        followers: &FollowerSource,
    ) -> Result<RecipientSet, ResolveError> {
        if !actor.id.is_key_safe() {
            return Err(ResolveError::InvalidActor {
                actor: actor.id.to_string(),
            });
        }
        let follower_ids = self.followers_of(actor, followers).await?;

        let mut recipients = Vec::with_capacity(follower_ids.len().saturating_add(3));
        recipients.push(Recipient::Global);
        recipients.push(Recipient::Activity(actor.id.clone()));
        recipients.push(Recipient::Posts(actor.id.clone()));
        recipients.extend(follower_ids.into_iter().map(Recipient::Activity));

        tracing::debug!(
            actor = %actor.id,
            recipients = recipients.len(),
            "Resolved recipients"
        );
        Ok(RecipientSet::new(recipients))
    }

    async fn followers_of(
        &self,
        actor: &EntitySnapshot,
        followers: &FollowerSource,
    ) -> Result<Vec<EntityId>, ResolveError> {
        let (key, ids) = match followers {
            FollowerSource::Relation(relation) => {
                let key = self.keys.relation_key(&actor.id, relation);
                let members = self
                    .store
                    .members(&key)
                    .await
                    .map_err(|source| ResolveError::Store {
                        key: key.clone(),
                        source,
                    })?;
                let ids = members.iter().map(|m| EntityId::parse(m)).collect();
                (key, ids)
            }
            FollowerSource::Fixed(ids) => ("followers".to_owned(), ids.clone()),
        };

        // Deduplicate on the rendered log key: `Int(2)` and `Text("2")` name
        // the same log, and the actor's own log is already a recipient.
        let mut seen = HashSet::with_capacity(ids.len().saturating_add(1));
        seen.insert(Recipient::Activity(actor.id.clone()).key(&self.keys));
        let mut unique = Vec::with_capacity(ids.len());
        for id in ids {
            if !id.is_key_safe() {
                return Err(ResolveError::InvalidMember {
                    key,
                    member: id.to_string(),
                });
            }
            if seen.insert(Recipient::Activity(id.clone()).key(&self.keys)) {
                unique.push(id);
            }
        }
        Ok(unique)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use timeline_store::MemoryLogStore;

    use super::*;

    fn actor() -> EntitySnapshot {
        EntitySnapshot::new(1_i64, "User", "Ada")
    }

    fn resolver(store: &MemoryLogStore) -> RecipientResolver {
        RecipientResolver::new(LogStore::from(store.clone()), KeyScheme::default())
    }

    #[tokio::test]
    async fn no_followers_still_reaches_actor_and_global() {
        let store = MemoryLogStore::new();
        let set = resolver(&store)
            .resolve(&actor(), &FollowerSource::followers())
            .await
            .unwrap();

        assert_eq!(
            set,
            RecipientSet::new(vec![
                Recipient::Global,
                Recipient::Activity(EntityId::Int(1)),
                Recipient::Posts(EntityId::Int(1)),
            ])
        );
    }

    #[tokio::test]
    async fn relation_members_become_activity_logs() {
        let store = MemoryLogStore::new();
        store.add_member("user:id:1:followers", "2");
        store.add_member("user:id:1:followers", "bob");

        let set = resolver(&store)
            .resolve(&actor(), &FollowerSource::followers())
            .await
            .unwrap();

        assert_eq!(set.len(), 5);
        assert!(set.contains(&Recipient::Activity(EntityId::Int(2))));
        assert!(set.contains(&Recipient::Activity(EntityId::from("bob"))));
        assert!(!set.contains(&Recipient::Posts(EntityId::Int(2))));
    }

    #[tokio::test]
    async fn custom_relation_name() {
        let store = MemoryLogStore::new();
        store.add_member("user:id:1:subscribers", "9");

        let set = resolver(&store)
            .resolve(&actor(), &FollowerSource::Relation("subscribers".to_owned()))
            .await
            .unwrap();
        assert!(set.contains(&Recipient::Activity(EntityId::Int(9))));
    }

    #[tokio::test]
    async fn fixed_followers_are_deduplicated() {
        let store = MemoryLogStore::new();
        let source = FollowerSource::Fixed(vec![EntityId::Int(2), EntityId::Int(3), EntityId::Int(2)]);

        let set = resolver(&store).resolve(&actor(), &source).await.unwrap();
        assert_eq!(set.len(), 5);
        // Fixed followers never touch the store.
        assert!(store.list_keys().is_empty());
    }

    #[tokio::test]
    async fn relation_read_failure_is_fatal() {
        let store = MemoryLogStore::new();
        store.fail_key("user:id:1:followers");

        let err = resolver(&store)
            .resolve(&actor(), &FollowerSource::followers())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Store { ref key, .. } if key == "user:id:1:followers"));
    }

    #[tokio::test]
    async fn actor_following_themselves_gets_one_copy() {
        let store = MemoryLogStore::new();
        store.add_member("user:id:1:followers", "1");
        store.add_member("user:id:1:followers", "2");

        let set = resolver(&store)
            .resolve(&actor(), &FollowerSource::followers())
            .await
            .unwrap();
        assert_eq!(
            set,
            RecipientSet::new(vec![
                Recipient::Global,
                Recipient::Activity(EntityId::Int(1)),
                Recipient::Posts(EntityId::Int(1)),
                Recipient::Activity(EntityId::Int(2)),
            ])
        );
    }

    #[tokio::test]
    async fn ids_naming_the_same_log_are_merged() {
        let store = MemoryLogStore::new();
        let source = FollowerSource::Fixed(vec![EntityId::Int(2), EntityId::from("2")]);

        let set = resolver(&store).resolve(&actor(), &source).await.unwrap();
        assert_eq!(set.len(), 4);
        assert!(set.contains(&Recipient::Activity(EntityId::Int(2))));
        assert!(!set.contains(&Recipient::Activity(EntityId::from("2"))));
    }

    #[tokio::test]
    async fn blank_actor_id_is_rejected() {
        let store = MemoryLogStore::new();
        let actor = EntitySnapshot::new(" ", "User", "Nobody");

        let err = resolver(&store)
            .resolve(&actor, &FollowerSource::followers())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::InvalidActor { .. }));
        assert!(store.list_keys().is_empty());
    }

    #[tokio::test]
    async fn blank_member_is_rejected() {
        let store = MemoryLogStore::new();
        let source = FollowerSource::Fixed(vec![EntityId::from("")]);

        let err = resolver(&store).resolve(&actor(), &source).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidMember { .. }));
    }
}
