//! The tracking pipeline: build, resolve, deliver.
//!
//! [`Tracker::track`] is what lifecycle hooks call. Construction and
//! resolution failures abort before any store I/O and surface as
//! [`TrackError`]; append failures are per recipient and come back inside
//! the [`DeliveryReport`].

use timeline_store::LogStore;
use timeline_types::ActivityEvent;

use crate::builder::{BuildError, EventBuilder, ExtraField, Participants};
use crate::config::TimelineConfig;
use crate::entity::Entity;
use crate::fanout::{DeliveryReport, FanoutWriter};
use crate::resolver::{FollowerSource, RecipientResolver, ResolveError};

/// Errors that abort a tracking invocation. Nothing was written.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    /// The event could not be constructed.
    #[error("construction failed: {source}")]
    Construction {
        /// The underlying build error.
        #[from]
        source: BuildError,
    },

    /// The recipients could not be resolved.
    #[error("resolution failed: {source}")]
    Resolution {
        /// The underlying resolution error.
        #[from]
        source: ResolveError,
    },

    /// The event could not be encoded.
    #[error("encoding failed: {source}")]
    Encoding {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// One action to record.
pub struct TrackRequest<'a, T> {
    /// Verb of the action.
    pub verb: &'a str,
    /// Entity whose lifecycle moment triggered the action.
    pub trigger: &'a T,
    /// Actor, optional object (defaults to `trigger`) and optional target.
    pub participants: Participants<'a>,
    /// Extra fields read off `trigger`.
    pub extra: &'a [ExtraField<T>],
    /// Where the actor's followers come from.
    pub followers: FollowerSource,
}

/// The assembled pipeline.
///
/// Holds the store handle (through the resolver and writer) and no other
/// state; one tracker serves any number of concurrent invocations.
#[derive(Debug, Clone)]
pub struct Tracker {
    builder: EventBuilder,
    resolver: RecipientResolver,
    writer: FanoutWriter,
    default_followers: FollowerSource,
}

impl Tracker {
    /// Assemble the pipeline around an opened store.
    pub fn new(store: LogStore, config: &TimelineConfig) -> Self {
        Self {
            builder: EventBuilder::new(),
            resolver: RecipientResolver::new(store.clone(), config.keys.clone()),
            writer: FanoutWriter::new(store, config.keys.clone())
                .with_max_concurrency(config.fanout.max_concurrency),
            default_followers: FollowerSource::Relation(config.fanout.followers_relation.clone()),
        }
    }

    /// Replace the event builder (e.g. to pin the clock in tests).
    #[must_use]
    pub const fn with_builder(mut self, builder: EventBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// The configured followers relation.
    pub const fn default_followers(&self) -> &FollowerSource {
        &self.default_followers
    }

    /// Record one action: build the event, resolve recipients and fan out.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError`] if construction, resolution or encoding
    /// fails. Per-recipient append failures are in the report.
    pub async fn track<T: Entity>(
        &self,
        request: TrackRequest<'_, T>,
    ) -> Result<DeliveryReport, TrackError> {
        let event = self
            .builder
            .build(request.verb, request.trigger, request.participants, request.extra)
            .inspect_err(|e| {
                tracing::warn!(verb = request.verb, error = %e, "Activity construction failed");
            })?;
        self.redeliver(&event, &request.followers).await
    }

    /// Resolve recipients for an already-built event and fan it out.
    ///
    /// The event keeps its `created_at`, so delivering the same event twice
    /// writes two identical entries.
    ///
    /// # Errors
    ///
    /// Returns [`TrackError`] if resolution or encoding fails.
    pub async fn redeliver(
        &self,
        event: &ActivityEvent,
        followers: &FollowerSource,
    ) -> Result<DeliveryReport, TrackError> {
        let recipients = self
            .resolver
            .resolve(&event.actor, followers)
            .await
            .inspect_err(|e| {
                tracing::warn!(verb = %event.verb, actor = %event.actor.id, error = %e, "Recipient resolution failed");
            })?;
        Ok(self.writer.deliver(event, &recipients).await?)
    }
}
