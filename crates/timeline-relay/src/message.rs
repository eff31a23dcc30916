//! Wire format of relayed track requests and their replies.
//!
//! Services that cannot link the pipeline send denormalized snapshots:
//!
//! ```json
//! {
//!   "verb": "like",
//!   "actor": { "id": 1, "type": "User", "label": "U1" },
//!   "object": { "id": 100, "type": "Post", "label": "P1" },
//!   "extra": { "rating": 5 },
//!   "followers": [2, 3]
//! }
//! ```
//!
//! `target`, `extra` and `followers` are optional. Without `followers` the
//! configured store relation is read.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use timeline_core::{DeliveryReport, ExtraField, FollowerSource};
use timeline_types::{EntityId, EntitySnapshot, Scalar};

use crate::error::RelayError;

/// One track request received over NATS.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrackMessage {
    /// Verb of the action.
    pub verb: String,
    /// Who performed it.
    pub actor: EntitySnapshot,
    /// What it was performed on. Also the triggering entity.
    pub object: EntitySnapshot,
    /// Optional secondary entity.
    #[serde(default)]
    pub target: Option<EntitySnapshot>,
    /// Extra scalar fields, copied into the event as given.
    #[serde(default)]
    pub extra: BTreeMap<String, Scalar>,
    /// Follower ids, when the sender already knows them.
    #[serde(default)]
    pub followers: Option<Vec<EntityId>>,
}

impl TrackMessage {
    /// Parse a NATS payload.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Parse`] if the payload is not a valid request.
    pub fn from_payload(data: &[u8]) -> Result<Self, RelayError> {
        serde_json::from_slice(data)
            .map_err(|e| RelayError::Parse(format!("failed to deserialize track request: {e}")))
    }

    /// The carried extras as fields of the triggering snapshot.
    pub fn extra_fields(&self) -> Vec<ExtraField<EntitySnapshot>> {
        self.extra
            .iter()
            .map(|(name, value)| {
                let value = value.clone();
                ExtraField::new(name.clone(), move |_: &EntitySnapshot| Ok(value.clone()))
            })
            .collect()
    }

    /// Where the actor's followers come from for this request.
    pub fn follower_source(&self, default: &FollowerSource) -> FollowerSource {
        self.followers
            .as_ref()
            .map_or_else(|| default.clone(), |ids| FollowerSource::Fixed(ids.clone()))
    }
}

/// A recipient log the event could not be appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDelivery {
    /// Log key.
    pub key: String,
    /// Store error message.
    pub error: String,
}

/// Reply for a request whose event was built and fanned out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySummary {
    /// Verb of the event.
    pub verb: String,
    /// Construction time of the event.
    pub created_at: DateTime<Utc>,
    /// Number of logs the event was appended to.
    pub delivered: usize,
    /// Logs the append failed for.
    pub failed: Vec<FailedDelivery>,
}

impl From<&DeliveryReport> for DeliverySummary {
    fn from(report: &DeliveryReport) -> Self {
        Self {
            verb: report.verb.clone(),
            created_at: report.created_at,
            delivered: report.delivered().count(),
            failed: report
                .failed()
                .filter_map(|outcome| {
                    outcome.result.as_ref().err().map(|e| FailedDelivery {
                        key: outcome.key.clone(),
                        error: e.source.to_string(),
                    })
                })
                .collect(),
        }
    }
}

/// What the relay publishes to a request's reply subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayReply {
    /// The event was fanned out (possibly with per-log failures).
    Delivered(DeliverySummary),
    /// Nothing was written.
    Failed {
        /// Why the request was rejected.
        error: String,
    },
}
