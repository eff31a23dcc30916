//! NATS pub/sub integration for track requests and replies.

use tracing::{debug, info};

use crate::error::RelayError;
use crate::message::RelayReply;

/// NATS client wrapper for the relay.
///
/// Manages a single NATS connection and provides methods for subscribing
/// to track requests and publishing replies.
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RelayError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Subscribe to the track request subject.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if the subscription fails.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, RelayError> {
        debug!(subject = subject, "subscribing to track requests");
        let subscriber = self
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| RelayError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, "subscribed to track requests");
        Ok(subscriber)
    }

    /// Publish `reply` on a request's reply subject.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if serialization or publishing fails.
    pub async fn reply(
        &self,
        subject: async_nats::Subject,
        reply: &RelayReply,
    ) -> Result<(), RelayError> {
        let payload = serde_json::to_vec(reply)
            .map_err(|e| RelayError::Nats(format!("failed to serialize reply: {e}")))?;
        debug!(subject = %subject, bytes = payload.len(), "publishing reply");
        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| RelayError::Nats(format!("failed to publish to {subject}: {e}")))
    }

    /// Flush pending replies to the server.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Nats`] if the flush fails.
    pub async fn flush(&self) -> Result<(), RelayError> {
        self.client
            .flush()
            .await
            .map_err(|e| RelayError::Nats(format!("flush failed: {e}")))
    }
}

impl std::fmt::Debug for NatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsClient")
            .field("connected", &true)
            .finish()
    }
}
