//! Typed trigger bindings.
//!
//! A [`BindingTable`] declares, for one entity type, which lifecycle moment
//! produces which verb and how to reach the actor, object, target, extra
//! fields and followers from the entity. Accessors are plain functions
//! checked by the compiler; the table itself is validated once when it is
//! built. Lifecycle hooks then call [`BindingTable::fire`].
//!
//! ```rust,ignore
//! let table = BindingTable::new(vec![
//!     Binding::new("comment", comment_author)
//!         .target(comment_post_owner)
//!         .extra("length", |c: &Comment| Ok(Scalar::from(c.body.len() as i64))),
//! ])?;
//!
//! // after the comment row is inserted:
//! table.fire(&tracker, Lifecycle::Create, &comment).await?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use timeline_types::{EntityId, Scalar};
use tracing::{debug, warn};

use crate::builder::{BuildError, ExtraField, Participants};
use crate::entity::{AccessError, Entity, type_tag_of};
use crate::fanout::DeliveryReport;
use crate::resolver::{FollowerSource, ResolveError};
use crate::tracker::{TrackError, TrackRequest, Tracker};

/// Lifecycle moment of a domain entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// After the entity was created.
    #[default]
    Create,
    /// After the entity was updated.
    Update,
    /// After the entity was destroyed.
    Destroy,
}

impl core::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Destroy => "destroy",
        })
    }
}

/// Errors found while validating a binding table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// A binding has an empty verb.
    #[error("binding #{index} has an empty verb")]
    EmptyVerb {
        /// Position of the binding in the table.
        index: usize,
    },

    /// An extra field has an empty name.
    #[error("binding {verb} declares an extra field with an empty name")]
    EmptyExtraName {
        /// Verb of the binding.
        verb: String,
    },

    /// Two extra fields share a name.
    #[error("binding {verb} declares extra field {field} twice")]
    DuplicateExtra {
        /// Verb of the binding.
        verb: String,
        /// The repeated field name.
        field: String,
    },

    /// A followers relation name is empty.
    #[error("binding {verb} names an empty followers relation")]
    EmptyRelation {
        /// Verb of the binding.
        verb: String,
    },

    /// Two bindings fire the same verb at the same moment.
    #[error("verb {verb} is bound twice on {on}")]
    Duplicate {
        /// The repeated verb.
        verb: String,
        /// The lifecycle moment.
        on: Lifecycle,
    },
}

/// Reaches a participant entity from the triggering entity.
pub type EntityAccessor<T> = fn(&T) -> Option<&dyn Entity>;

/// Reaches the actor's followers.
pub enum FollowersAccessor<T> {
    /// A store relation of the actor, by name.
    Relation(String),
    /// Follower ids loaded by the domain model from the triggering entity.
    Loaded(Arc<dyn Fn(&T) -> Result<Vec<EntityId>, AccessError> + Send + Sync>),
}

impl<T> Clone for FollowersAccessor<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Relation(name) => Self::Relation(name.clone()),
            Self::Loaded(load) => Self::Loaded(Arc::clone(load)),
        }
    }
}

impl<T> core::fmt::Debug for FollowersAccessor<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Relation(name) => f.debug_tuple("Relation").field(name).finish(),
            Self::Loaded(_) => f.write_str("Loaded(..)"),
        }
    }
}

/// One (moment, verb) binding for entity type `T`.
pub struct Binding<T> {
    verb: String,
    on: Lifecycle,
    actor: EntityAccessor<T>,
    object: Option<EntityAccessor<T>>,
    target: Option<EntityAccessor<T>>,
    extra: Vec<ExtraField<T>>,
    followers: Option<FollowersAccessor<T>>,
    condition: Option<fn(&T) -> bool>,
}

impl<T: Entity> Binding<T> {
    /// Bind `verb` on [`Lifecycle::Create`], with the actor reached through
    /// `actor`. The object is the entity itself unless [`Binding::object`]
    /// is set; followers come from the tracker's configured relation.
    pub fn new(verb: impl Into<String>, actor: EntityAccessor<T>) -> Self {
        Self {
            verb: verb.into(),
            on: Lifecycle::Create,
            actor,
            object: None,
            target: None,
            extra: Vec::new(),
            followers: None,
            condition: None,
        }
    }

    /// Fire on `moment` instead of create.
    #[must_use]
    pub const fn on(mut self, moment: Lifecycle) -> Self {
        self.on = moment;
        self
    }

    /// Reach the object through `object` instead of using the entity.
    #[must_use]
    pub const fn object(mut self, object: EntityAccessor<T>) -> Self {
        self.object = Some(object);
        self
    }

    /// Reach an optional target through `target`.
    #[must_use]
    pub const fn target(mut self, target: EntityAccessor<T>) -> Self {
        self.target = Some(target);
        self
    }

    /// Record the scalar `read` returns under `name` in `extra`.
    #[must_use]
    pub fn extra<F>(mut self, name: impl Into<String>, read: F) -> Self
    where
        F: Fn(&T) -> Result<Scalar, AccessError> + Send + Sync + 'static,
    {
        self.extra.push(ExtraField::new(name, read));
        self
    }

    /// Read followers from the store relation `relation`.
    #[must_use]
    pub fn followers_relation(mut self, relation: impl Into<String>) -> Self {
        self.followers = Some(FollowersAccessor::Relation(relation.into()));
        self
    }

    /// Load follower ids from the entity with `load`.
    #[must_use]
    pub fn followers_with<F>(mut self, load: F) -> Self
    where
        F: Fn(&T) -> Result<Vec<EntityId>, AccessError> + Send + Sync + 'static,
    {
        self.followers = Some(FollowersAccessor::Loaded(Arc::new(load)));
        self
    }

    /// Only fire when `condition` holds for the entity.
    #[must_use]
    pub const fn when(mut self, condition: fn(&T) -> bool) -> Self {
        self.condition = Some(condition);
        self
    }

    /// The bound verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// The lifecycle moment the binding fires on.
    pub const fn lifecycle(&self) -> Lifecycle {
        self.on
    }

    fn validate(&self, index: usize) -> Result<(), BindingError> {
        if self.verb.is_empty() {
            return Err(BindingError::EmptyVerb { index });
        }
        let mut names = HashSet::with_capacity(self.extra.len());
        for field in &self.extra {
            if field.name().is_empty() {
                return Err(BindingError::EmptyExtraName {
                    verb: self.verb.clone(),
                });
            }
            if !names.insert(field.name()) {
                return Err(BindingError::DuplicateExtra {
                    verb: self.verb.clone(),
                    field: field.name().to_owned(),
                });
            }
        }
        if matches!(&self.followers, Some(FollowersAccessor::Relation(name)) if name.is_empty()) {
            return Err(BindingError::EmptyRelation {
                verb: self.verb.clone(),
            });
        }
        Ok(())
    }

    /// Run this binding for `entity`. `Ok(None)` when the condition skipped
    /// it.
    async fn fire(
        &self,
        tracker: &Tracker,
        entity: &T,
    ) -> Result<Option<DeliveryReport>, TrackError> {
        if self.condition.is_some_and(|condition| !condition(entity)) {
            debug!(
                verb = %self.verb,
                entity_type = type_tag_of::<T>(),
                "Binding condition not met, skipping"
            );
            return Ok(None);
        }

        let actor = (self.actor)(entity).ok_or_else(|| BuildError::MissingActor {
            verb: self.verb.clone(),
        })?;
        let object = self
            .object
            .map(|object| {
                object(entity).ok_or_else(|| BuildError::MissingObject {
                    verb: self.verb.clone(),
                })
            })
            .transpose()?;
        let target = self.target.and_then(|target| target(entity));

        let followers = match &self.followers {
            None => tracker.default_followers().clone(),
            Some(FollowersAccessor::Relation(name)) => FollowerSource::Relation(name.clone()),
            Some(FollowersAccessor::Loaded(load)) => {
                FollowerSource::Fixed(load(entity).map_err(ResolveError::from)?)
            }
        };

        let report = tracker
            .track(TrackRequest {
                verb: &self.verb,
                trigger: entity,
                participants: Participants {
                    actor,
                    object,
                    target,
                },
                extra: &self.extra,
                followers,
            })
            .await?;
        Ok(Some(report))
    }
}

impl<T> core::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Binding")
            .field("verb", &self.verb)
            .field("on", &self.on)
            .field("has_object", &self.object.is_some())
            .field("has_target", &self.target.is_some())
            .field("extra", &self.extra)
            .field("followers", &self.followers)
            .finish_non_exhaustive()
    }
}

/// Validated bindings for entity type `T`.
#[derive(Debug)]
pub struct BindingTable<T> {
    bindings: Vec<Binding<T>>,
}

impl<T: Entity> BindingTable<T> {
    /// Validate `bindings` and build the table.
    ///
    /// # Errors
    ///
    /// Returns the first [`BindingError`] found.
    pub fn new(bindings: Vec<Binding<T>>) -> Result<Self, BindingError> {
        let mut seen = HashSet::with_capacity(bindings.len());
        for (index, binding) in bindings.iter().enumerate() {
            binding.validate(index)?;
            if !seen.insert((binding.on, binding.verb.as_str())) {
                return Err(BindingError::Duplicate {
                    verb: binding.verb.clone(),
                    on: binding.on,
                });
            }
        }
        debug!(
            entity_type = type_tag_of::<T>(),
            bindings = bindings.len(),
            "Binding table validated"
        );
        Ok(Self { bindings })
    }

    /// Bindings that fire on `moment`, in declaration order.
    pub fn bindings_for(&self, moment: Lifecycle) -> impl Iterator<Item = &Binding<T>> {
        self.bindings.iter().filter(move |b| b.on == moment)
    }

    /// Number of bindings.
    pub const fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table is empty.
    pub const fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run every binding for `moment` against `entity`, in declaration
    /// order.
    ///
    /// Returns one report per binding that ran (bindings skipped by their
    /// condition produce none).
    ///
    /// # Errors
    ///
    /// Returns the first [`TrackError`]; bindings after it do not run.
    /// Reports of bindings that already ran are logged, not returned.
    pub async fn fire(
        &self,
        tracker: &Tracker,
        moment: Lifecycle,
        entity: &T,
    ) -> Result<Vec<DeliveryReport>, TrackError> {
        let mut reports = Vec::new();
        for binding in self.bindings_for(moment) {
            match binding.fire(tracker, entity).await {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        verb = %binding.verb,
                        on = %moment,
                        entity_type = type_tag_of::<T>(),
                        already_delivered = reports.len(),
                        error = %e,
                        "Binding failed"
                    );
                    return Err(e);
                }
            }
        }
        Ok(reports)
    }
}
