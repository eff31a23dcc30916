//! Fan-out delivery.
//!
//! The [`FanoutWriter`] encodes an event once and appends the same payload
//! to every recipient log. Appends are independent: a failed append is
//! recorded in the [`DeliveryReport`] and the others still run. Nothing is
//! retried or rolled back.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream;
use timeline_store::{LogStore, StoreError};
use timeline_types::{ActivityEvent, EncodedEvent, KeyScheme, Recipient, RecipientSet};
use tracing::{debug, info, warn};

/// Default number of appends in flight for one delivery.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// A failed append to one recipient log.
#[derive(Debug, thiserror::Error)]
#[error("append to {key} failed: {source}")]
pub struct DeliveryError {
    /// Log key the append targeted.
    pub key: String,
    /// The underlying store error.
    pub source: StoreError,
}

/// Outcome of the append to one recipient log.
#[derive(Debug)]
pub struct RecipientOutcome {
    /// The recipient.
    pub recipient: Recipient,
    /// Store key of the recipient's log.
    pub key: String,
    /// `Ok` if the entry was appended.
    pub result: Result<(), DeliveryError>,
}

impl RecipientOutcome {
    /// Whether the append succeeded.
    pub const fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-recipient outcome of one delivery, in recipient order.
#[derive(Debug)]
pub struct DeliveryReport {
    /// Verb of the delivered event.
    pub verb: String,
    /// Construction time of the delivered event.
    pub created_at: DateTime<Utc>,
    /// One outcome per recipient.
    pub outcomes: Vec<RecipientOutcome>,
}

impl DeliveryReport {
    /// Outcomes whose append succeeded.
    pub fn delivered(&self) -> impl Iterator<Item = &RecipientOutcome> {
        self.outcomes.iter().filter(|o| o.is_delivered())
    }

    /// Outcomes whose append failed.
    pub fn failed(&self) -> impl Iterator<Item = &RecipientOutcome> {
        self.outcomes.iter().filter(|o| !o.is_delivered())
    }

    /// Whether every recipient received the event.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(RecipientOutcome::is_delivered)
    }

    /// Number of recipients.
    pub const fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether the report covers no recipients.
    pub const fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome for `recipient`, if it was part of the delivery.
    pub fn outcome(&self, recipient: &Recipient) -> Option<&RecipientOutcome> {
        self.outcomes.iter().find(|o| &o.recipient == recipient)
    }
}

/// Appends encoded events to recipient logs.
#[derive(Debug, Clone)]
pub struct FanoutWriter {
    store: LogStore,
    keys: KeyScheme,
    max_concurrency: usize,
}

impl FanoutWriter {
    /// Writer appending to `store`, naming logs with `keys`.
    pub const fn new(store: LogStore, keys: KeyScheme) -> Self {
        Self {
            store,
            keys,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Set how many appends may be in flight at once (at least one).
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Deliver `event` to every recipient.
    ///
    /// The event is encoded exactly once. Appends run with bounded
    /// concurrency and every outcome is awaited before returning.
    ///
    /// # Errors
    ///
    /// Returns the encoding error, before any append, if the event cannot
    /// be serialized. Append failures are reported in the
    /// [`DeliveryReport`] instead.
    pub async fn deliver(
        &self,
        event: &ActivityEvent,
        recipients: &RecipientSet,
    ) -> Result<DeliveryReport, serde_json::Error> {
        let payload = event.encode()?;
        let outcomes = self.append_all(&payload, recipients).await;

        let report = DeliveryReport {
            verb: event.verb.clone(),
            created_at: event.created_at,
            outcomes,
        };

        let failed = report.failed().count();
        if failed == 0 {
            info!(
                verb = %report.verb,
                actor = %event.actor.id,
                recipients = report.len(),
                bytes = payload.len(),
                "Delivered activity"
            );
        } else {
            warn!(
                verb = %report.verb,
                actor = %event.actor.id,
                recipients = report.len(),
                failed,
                "Delivered activity with failures"
            );
        }
        Ok(report)
    }

    async fn append_all(
        &self,
        payload: &EncodedEvent,
        recipients: &RecipientSet,
    ) -> Vec<RecipientOutcome> {
        let mut indexed: Vec<(usize, RecipientOutcome)> =
            stream::iter(recipients.iter().enumerate().map(|(index, recipient)| {
                let key = recipient.key(&self.keys);
                async move {
                    let result = self.store.append(&key, payload.as_str()).await;
                    let result = match result {
                        Ok(()) => {
                            debug!(key = %key, "Appended activity");
                            Ok(())
                        }
                        Err(source) => {
                            warn!(key = %key, error = %source, "Failed to append activity");
                            Err(DeliveryError {
                                key: key.clone(),
                                source,
                            })
                        }
                    };
                    let outcome = RecipientOutcome {
                        recipient: recipient.clone(),
                        key,
                        result,
                    };
                    (index, outcome)
                }
            }))
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        // Completion order is arbitrary; report in recipient order.
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use timeline_store::MemoryLogStore;
    use timeline_types::{EntityId, EntitySnapshot, Scalar};

    use super::*;

    fn event() -> ActivityEvent {
        let mut extra = BTreeMap::new();
        extra.insert("rating".to_owned(), Scalar::Int(5));
        ActivityEvent {
            verb: "like".to_owned(),
            actor: EntitySnapshot::new(1_i64, "User", "U1"),
            object: EntitySnapshot::new(100_i64, "Post", "P1"),
            target: None,
            extra,
            created_at: Utc.with_ymd_and_hms(2026, 5, 1, 9, 30, 0).unwrap(),
        }
    }

    fn recipients(followers: &[i64]) -> RecipientSet {
        let mut list = vec![
            Recipient::Global,
            Recipient::Activity(EntityId::Int(1)),
            Recipient::Posts(EntityId::Int(1)),
        ];
        list.extend(followers.iter().map(|id| Recipient::Activity(EntityId::Int(*id))));
        RecipientSet::new(list)
    }

    fn writer(store: &MemoryLogStore) -> FanoutWriter {
        FanoutWriter::new(LogStore::from(store.clone()), KeyScheme::default())
    }

    #[tokio::test]
    async fn one_append_per_recipient() {
        let store = MemoryLogStore::new();
        let report = writer(&store)
            .deliver(&event(), &recipients(&[2, 3]))
            .await
            .unwrap();

        assert!(report.is_complete());
        assert_eq!(report.len(), 5);
        assert_eq!(store.append_count(), 5);
        assert_eq!(
            store.list_keys(),
            vec![
                "global:activity",
                "user:id:1:activity",
                "user:id:1:posts",
                "user:id:2:activity",
                "user:id:3:activity",
            ]
        );
    }

    #[tokio::test]
    async fn every_copy_is_byte_identical() {
        let store = MemoryLogStore::new();
        writer(&store)
            .deliver(&event(), &recipients(&[2, 3]))
            .await
            .unwrap();

        let expected = event().encode().unwrap();
        for key in store.list_keys() {
            assert_eq!(store.entries(&key), vec![expected.as_str().to_owned()], "{key}");
        }
    }

    #[tokio::test]
    async fn failed_recipient_does_not_block_others() {
        let store = MemoryLogStore::new();
        store.fail_key("user:id:2:activity");

        let report = writer(&store)
            .deliver(&event(), &recipients(&[2, 3]))
            .await
            .unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.delivered().count(), 4);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].key, "user:id:2:activity");
        assert_eq!(failed[0].recipient, Recipient::Activity(EntityId::Int(2)));

        assert_eq!(store.entries("global:activity").len(), 1);
        assert_eq!(store.entries("user:id:3:activity").len(), 1);
        assert!(store.entries("user:id:2:activity").is_empty());
    }

    #[tokio::test]
    async fn report_keeps_recipient_order() {
        let store = MemoryLogStore::new();
        let followers: Vec<i64> = (2..40).collect();
        let report = writer(&store)
            .with_max_concurrency(4)
            .deliver(&event(), &recipients(&followers))
            .await
            .unwrap();

        let expected: Vec<Recipient> = recipients(&followers).iter().cloned().collect();
        let actual: Vec<Recipient> = report.outcomes.iter().map(|o| o.recipient.clone()).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn zero_concurrency_is_clamped() {
        let store = MemoryLogStore::new();
        let report = writer(&store)
            .with_max_concurrency(0)
            .deliver(&event(), &recipients(&[]))
            .await
            .unwrap();
        assert_eq!(report.len(), 3);
        assert!(report.outcome(&Recipient::Global).unwrap().is_delivered());
    }

    #[tokio::test]
    async fn redelivery_keeps_created_at() {
        let store = MemoryLogStore::new();
        let event = event();
        let w = writer(&store);
        let first = w.deliver(&event, &recipients(&[])).await.unwrap();
        let second = w.deliver(&event, &recipients(&[])).await.unwrap();
        assert_eq!(first.created_at, second.created_at);

        let entries = store.entries("global:activity");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entries[1]);
    }
}
