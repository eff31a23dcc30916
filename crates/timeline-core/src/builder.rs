//! Event construction.
//!
//! The [`EventBuilder`] turns a verb, the participating entities and the
//! configured extra fields into an [`ActivityEvent`]. It reads accessor values
//! and the clock; it never touches the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use timeline_types::{ActivityEvent, Scalar};

use crate::entity::{AccessError, Entity};
use crate::snapshot::{Role, snapshot, snapshot_of};

/// Errors raised while constructing an event. Nothing has been written when
/// one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The verb was empty.
    #[error("verb must not be empty")]
    EmptyVerb,

    /// The actor accessor produced no entity.
    #[error("no actor for verb {verb}")]
    MissingActor {
        /// The verb being tracked.
        verb: String,
    },

    /// A configured object accessor produced no entity.
    #[error("no object for verb {verb}")]
    MissingObject {
        /// The verb being tracked.
        verb: String,
    },

    /// Snapshotting a participant failed.
    #[error("{role} snapshot failed: {source}")]
    Snapshot {
        /// Which participant failed.
        role: Role,
        /// The underlying accessor error.
        source: AccessError,
    },

    /// Reading an extra field off the triggering entity failed.
    #[error("extra field {field} failed: {source}")]
    Extra {
        /// Name of the extra field.
        field: String,
        /// The underlying accessor error.
        source: AccessError,
    },
}

/// Reads one named scalar off the triggering entity.
pub struct ExtraField<T: ?Sized> {
    name: String,
    read: Arc<dyn Fn(&T) -> Result<Scalar, AccessError> + Send + Sync>,
}

impl<T: ?Sized> ExtraField<T> {
    /// Declare an extra field `name` read by `read`.
    pub fn new<F>(name: impl Into<String>, read: F) -> Self
    where
        F: Fn(&T) -> Result<Scalar, AccessError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            read: Arc::new(read),
        }
    }

    /// Key the value is stored under in `extra`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the value off `entity`.
    ///
    /// # Errors
    ///
    /// Returns whatever the accessor returns.
    pub fn read(&self, entity: &T) -> Result<Scalar, AccessError> {
        (self.read)(entity)
    }
}

impl<T: ?Sized> Clone for ExtraField<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            read: Arc::clone(&self.read),
        }
    }
}

impl<T: ?Sized> core::fmt::Debug for ExtraField<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExtraField").field("name", &self.name).finish()
    }
}

/// The entities taking part in one action.
#[derive(Clone, Copy)]
pub struct Participants<'a> {
    /// Who performed the action.
    pub actor: &'a dyn Entity,
    /// What it was performed on. `None` means the triggering entity.
    pub object: Option<&'a dyn Entity>,
    /// Optional secondary entity.
    pub target: Option<&'a dyn Entity>,
}

impl<'a> Participants<'a> {
    /// Only an actor; object defaults to the trigger, no target.
    pub const fn actor(actor: &'a dyn Entity) -> Self {
        Self {
            actor,
            object: None,
            target: None,
        }
    }

    /// Set an explicit object.
    #[must_use]
    pub const fn with_object(mut self, object: &'a dyn Entity) -> Self {
        self.object = Some(object);
        self
    }

    /// Set a target.
    #[must_use]
    pub const fn with_target(mut self, target: &'a dyn Entity) -> Self {
        self.target = Some(target);
        self
    }
}

/// Source of `created_at`.
pub type Clock = fn() -> DateTime<Utc>;

/// Builds [`ActivityEvent`]s.
#[derive(Debug, Clone, Copy)]
pub struct EventBuilder {
    clock: Clock,
}

impl EventBuilder {
    /// Builder stamping events with the current UTC time.
    pub const fn new() -> Self {
        Self { clock: Utc::now }
    }

    /// Builder stamping events with `clock`.
    pub const fn with_clock(clock: Clock) -> Self {
        Self { clock }
    }

    /// Build the event for `verb` triggered by `trigger`.
    ///
    /// The object defaults to `trigger` when `participants.object` is
    /// `None`. Extra fields are read off `trigger` in declaration order and
    /// stored keyed by name, so the event's `extra` map is ordered by key.
    /// Non-finite floats are rejected since JSON cannot carry them.
    /// `created_at` is taken from the clock here and never again.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] if the verb is empty or any accessor fails.
    pub fn build<T: Entity>(
        &self,
        verb: &str,
        trigger: &T,
        participants: Participants<'_>,
        extra: &[ExtraField<T>],
    ) -> Result<ActivityEvent, BuildError> {
        if verb.is_empty() {
            return Err(BuildError::EmptyVerb);
        }

        let actor = snapshot_of(participants.actor).map_err(|source| BuildError::Snapshot {
            role: Role::Actor,
            source,
        })?;

        let object_ref: &dyn Entity = participants.object.unwrap_or(trigger);
        let object = snapshot_of(object_ref).map_err(|source| BuildError::Snapshot {
            role: Role::Object,
            source,
        })?;

        let target = snapshot(participants.target).map_err(|source| BuildError::Snapshot {
            role: Role::Target,
            source,
        })?;

        let mut values = BTreeMap::new();
        for field in extra {
            let value = field
                .read(trigger)
                .and_then(|value| match value {
                    Scalar::Float(f) if !f.is_finite() => {
                        Err(AccessError::invalid(field.name(), format!("non-finite float {f}")))
                    }
                    other => Ok(other),
                })
                .map_err(|source| BuildError::Extra {
                    field: field.name().to_owned(),
                    source,
                })?;
            values.insert(field.name().to_owned(), value);
        }

        Ok(ActivityEvent {
            verb: verb.to_owned(),
            actor,
            object,
            target,
            extra: values,
            created_at: (self.clock)(),
        })
    }
}

impl Default for EventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use timeline_types::{EntityId, EntitySnapshot};

    use super::*;

    struct Review {
        id: i64,
        rating: Option<u32>,
        author: EntitySnapshot,
    }

    impl Entity for Review {
        fn id(&self) -> Result<EntityId, AccessError> {
            Ok(EntityId::Int(self.id))
        }

        fn type_tag(&self) -> &str {
            "Review"
        }

        fn label(&self) -> Result<String, AccessError> {
            Ok(format!("Review #{}", self.id))
        }
    }

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap()
    }

    fn review() -> Review {
        Review {
            id: 10,
            rating: Some(5),
            author: EntitySnapshot::new(1_i64, "User", "Ada"),
        }
    }

    fn rating() -> ExtraField<Review> {
        ExtraField::new("rating", |r: &Review| Ok(Scalar::from(r.rating)))
    }

    #[test]
    fn object_defaults_to_trigger() {
        let review = review();
        let event = EventBuilder::with_clock(fixed_clock)
            .build("review", &review, Participants::actor(&review.author), &[])
            .unwrap();

        assert_eq!(event.verb, "review");
        assert_eq!(event.actor.label, "Ada");
        assert_eq!(event.object, EntitySnapshot::new(10_i64, "Review", "Review #10"));
        assert!(event.target.is_none());
        assert!(event.extra.is_empty());
        assert_eq!(event.created_at, fixed_clock());
    }

    #[test]
    fn explicit_object_and_target() {
        let review = review();
        let post = EntitySnapshot::new(20_i64, "Post", "Hello");
        let owner = EntitySnapshot::new(2_i64, "User", "Grace");
        let event = EventBuilder::with_clock(fixed_clock)
            .build(
                "review",
                &review,
                Participants::actor(&review.author)
                    .with_object(&post)
                    .with_target(&owner),
                &[],
            )
            .unwrap();

        assert_eq!(event.object, post);
        assert_eq!(event.target, Some(owner));
    }

    #[test]
    fn extras_are_read_from_the_trigger() {
        let mut review = review();
        let fields = vec![
            rating(),
            ExtraField::new("author_label", |r: &Review| Ok(Scalar::from(r.author.label.clone()))),
        ];
        let event = EventBuilder::new()
            .build("review", &review, Participants::actor(&review.author), &fields)
            .unwrap();
        assert_eq!(event.extra.get("rating"), Some(&Scalar::Int(5)));
        assert_eq!(event.extra.get("author_label"), Some(&Scalar::Text("Ada".to_owned())));

        review.rating = None;
        let event = EventBuilder::new()
            .build("review", &review, Participants::actor(&review.author), &fields)
            .unwrap();
        assert_eq!(event.extra.get("rating"), Some(&Scalar::Null));
    }

    #[test]
    fn non_finite_float_extra_is_rejected() {
        let review = review();
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let fields = vec![ExtraField::new("score", move |_: &Review| Ok(Scalar::Float(bad)))];
            let err = EventBuilder::new()
                .build("review", &review, Participants::actor(&review.author), &fields)
                .unwrap_err();
            assert!(matches!(
                err,
                BuildError::Extra {
                    ref field,
                    source: AccessError::Invalid { .. },
                } if field == "score"
            ));
        }

        let fields = vec![ExtraField::new("score", |_: &Review| Ok(Scalar::Float(2.5)))];
        let event = EventBuilder::new()
            .build("review", &review, Participants::actor(&review.author), &fields)
            .unwrap();
        let decoded = ActivityEvent::decode(event.encode().unwrap().as_str()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn extra_map_is_ordered_by_key() {
        let review = review();
        let fields = vec![
            ExtraField::new("zeta", |_: &Review| Ok(Scalar::Int(1))),
            ExtraField::new("alpha", |_: &Review| Ok(Scalar::Int(2))),
        ];
        let event = EventBuilder::new()
            .build("review", &review, Participants::actor(&review.author), &fields)
            .unwrap();
        let keys: Vec<&str> = event.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["alpha", "zeta"]);
        let encoded = event.encode().unwrap();
        let alpha = encoded.as_str().find("\"alpha\"").unwrap();
        let zeta = encoded.as_str().find("\"zeta\"").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn failing_extra_names_the_field() {
        let review = review();
        let fields = vec![ExtraField::new("score", |_: &Review| {
            Err(AccessError::missing("score"))
        })];
        let err = EventBuilder::new()
            .build("review", &review, Participants::actor(&review.author), &fields)
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::Extra {
                field: "score".to_owned(),
                source: AccessError::missing("score"),
            }
        );
    }

    #[test]
    fn empty_verb_is_rejected() {
        let review = review();
        let err = EventBuilder::new()
            .build("", &review, Participants::actor(&review.author), &[])
            .unwrap_err();
        assert_eq!(err, BuildError::EmptyVerb);
    }

    #[test]
    fn failing_target_is_reported_with_role() {
        struct Gone;
        impl Entity for Gone {
            fn id(&self) -> Result<EntityId, AccessError> {
                Err(AccessError::missing("id"))
            }
            fn type_tag(&self) -> &str {
                "Gone"
            }
            fn label(&self) -> Result<String, AccessError> {
                Ok(String::new())
            }
        }

        let review = review();
        let err = EventBuilder::new()
            .build(
                "review",
                &review,
                Participants::actor(&review.author).with_target(&Gone),
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, BuildError::Snapshot { role: Role::Target, .. }));
        assert!(err.to_string().starts_with("target snapshot failed"));
    }
}
