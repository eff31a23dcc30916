//! The relay loop: receive track requests, run the pipeline, reply.

use futures::StreamExt;
use timeline_core::{Participants, TrackRequest, Tracker};
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::message::{DeliverySummary, RelayReply, TrackMessage};
use crate::nats::NatsClient;

/// Runs relayed track requests through a [`Tracker`].
#[derive(Debug)]
pub struct Relay {
    nats: NatsClient,
    tracker: Tracker,
    subject: String,
}

impl Relay {
    /// Relay requests from `subject` into `tracker`.
    pub const fn new(nats: NatsClient, tracker: Tracker, subject: String) -> Self {
        Self {
            nats,
            tracker,
            subject,
        }
    }

    /// Process requests until the subscription ends.
    ///
    /// Requests are handled one at a time. Malformed payloads are logged
    /// and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if the subscription cannot be created.
    pub async fn run(&self) -> Result<(), RelayError> {
        let mut subscriber = self.nats.subscribe(&self.subject).await?;
        info!(subject = %self.subject, "relay started, awaiting track requests");

        while let Some(message) = subscriber.next().await {
            debug!(
                subject = %message.subject,
                payload_size = message.payload.len(),
                "received track request"
            );

            let request = match TrackMessage::from_payload(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!(subject = %message.subject, error = %e, "malformed track request, skipping");
                    continue;
                }
            };

            let reply = handle(&self.tracker, &request).await;
            if let Some(reply_to) = message.reply
                && let Err(e) = self.nats.reply(reply_to, &reply).await
            {
                warn!(verb = %request.verb, error = %e, "failed to publish reply");
            }
        }

        info!("NATS subscription ended, relay shutting down");
        Ok(())
    }

    /// Flush outstanding replies.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if the flush fails.
    pub async fn flush(&self) -> Result<(), RelayError> {
        self.nats.flush().await
    }
}

/// Run one request through `tracker` and describe the outcome.
pub async fn handle(tracker: &Tracker, request: &TrackMessage) -> RelayReply {
    let extra = request.extra_fields();
    let mut participants = Participants::actor(&request.actor);
    if let Some(target) = &request.target {
        participants = participants.with_target(target);
    }

    let result = tracker
        .track(TrackRequest {
            verb: &request.verb,
            trigger: &request.object,
            participants,
            extra: &extra,
            followers: request.follower_source(tracker.default_followers()),
        })
        .await;

    match result {
        Ok(report) => {
            let summary = DeliverySummary::from(&report);
            info!(
                verb = %summary.verb,
                actor = %request.actor.id,
                delivered = summary.delivered,
                failed = summary.failed.len(),
                "Relayed activity"
            );
            RelayReply::Delivered(summary)
        }
        Err(e) => {
            warn!(verb = %request.verb, actor = %request.actor.id, error = %e, "Relayed request rejected");
            RelayReply::Failed {
                error: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable)]
mod tests {
    use timeline_core::TimelineConfig;
    use timeline_store::{LogStore, MemoryLogStore};
    use timeline_types::ActivityEvent;

    use super::*;

    fn tracker(store: &MemoryLogStore) -> Tracker {
        Tracker::new(LogStore::from(store.clone()), &TimelineConfig::default())
    }

    fn request(json: &str) -> TrackMessage {
        TrackMessage::from_payload(json.as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn relayed_like_reaches_every_log() {
        let store = MemoryLogStore::new();
        let message = request(
            r#"{
                "verb": "like",
                "actor": {"id": 1, "type": "User", "label": "U1"},
                "object": {"id": 100, "type": "Post", "label": "P1"},
                "extra": {"rating": 5},
                "followers": [2, 3]
            }"#,
        );

        let reply = handle(&tracker(&store), &message).await;
        let RelayReply::Delivered(summary) = reply else {
            unreachable!("expected a delivery summary");
        };
        assert_eq!(summary.verb, "like");
        assert_eq!(summary.delivered, 5);
        assert!(summary.failed.is_empty());

        let entries = store.entries("user:id:3:activity");
        let event = ActivityEvent::decode(entries.first().unwrap()).unwrap();
        assert_eq!(event.object, message.object);
        assert_eq!(event.extra, message.extra);
        assert_eq!(event.created_at, summary.created_at);
    }

    #[tokio::test]
    async fn store_relation_used_without_followers_field() {
        let store = MemoryLogStore::new();
        store.add_member("user:id:1:followers", "9");
        let message = request(
            r#"{
                "verb": "post",
                "actor": {"id": 1, "type": "User", "label": "U1"},
                "object": {"id": 5, "type": "Post", "label": "Hi"}
            }"#,
        );

        let reply = handle(&tracker(&store), &message).await;
        assert!(matches!(reply, RelayReply::Delivered(ref s) if s.delivered == 4));
        assert_eq!(store.entries("user:id:9:activity").len(), 1);
    }

    #[tokio::test]
    async fn failed_appends_are_listed() {
        let store = MemoryLogStore::new();
        store.fail_key("global:activity");
        let message = request(
            r#"{
                "verb": "post",
                "actor": {"id": 1, "type": "User", "label": "U1"},
                "object": {"id": 5, "type": "Post", "label": "Hi"},
                "followers": []
            }"#,
        );

        let reply = handle(&tracker(&store), &message).await;
        let RelayReply::Delivered(summary) = reply else {
            unreachable!("expected a delivery summary");
        };
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed.first().map(|f| f.key.as_str()), Some("global:activity"));
    }

    #[tokio::test]
    async fn rejected_request_replies_with_error() {
        let store = MemoryLogStore::new();
        let message = request(
            r#"{
                "verb": "",
                "actor": {"id": 1, "type": "User", "label": "U1"},
                "object": {"id": 5, "type": "Post", "label": "Hi"}
            }"#,
        );

        let reply = handle(&tracker(&store), &message).await;
        assert!(matches!(reply, RelayReply::Failed { .. }));
        assert_eq!(store.append_count(), 0);
    }
}
