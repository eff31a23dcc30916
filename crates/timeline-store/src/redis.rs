//! Redis / `Dragonfly` backed log store.
//!
//! Feeds are Redis lists; new entries are pushed at the head (`LPUSH`) so a
//! feed reads most-recent-first. Relations such as an actor's followers are
//! Redis sets read with `SMEMBERS`.

use std::time::Duration;

use fred::prelude::*;

use crate::error::StoreError;

/// Connection handle to a Redis-compatible server.
///
/// Wraps a [`fred::prelude::Client`]. Cloning is cheap and shares the
/// underlying connection.
#[derive(Clone)]
pub struct RedisLogStore {
    client: Client,
}

impl RedisLogStore {
    /// Connect to the server at `url`.
    ///
    /// The URL follows the Redis URL scheme: `redis://host:port` or
    /// `redis://host:port/db`. Every command issued through the handle is
    /// bounded by `command_timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Redis`] if the connection fails.
    pub async fn connect(url: &str, command_timeout: Duration) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Redis URL: {e}")))?;

        let mut builder = Builder::from_config(config);
        builder.with_performance_config(|perf| {
            perf.default_command_timeout = command_timeout;
        });
        let client = builder.build()?;
        client.init().await?;

        tracing::info!(
            timeout_ms = u64::try_from(command_timeout.as_millis()).unwrap_or(u64::MAX),
            "Connected to Redis"
        );
        Ok(Self { client })
    }

    /// Push `payload` onto the head of the list at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] if the write fails.
    pub async fn append(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        let _: u64 = self.client.lpush(key, payload).await?;
        Ok(())
    }

    /// Read every member of the set at `key`.
    ///
    /// A missing key reads as an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] if the read fails.
    pub async fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let members: Vec<String> = self.client.smembers(key).await?;
        Ok(members)
    }

    /// Close the connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Redis`] if the `QUIT` fails.
    pub async fn close(&self) -> Result<(), StoreError> {
        self.client.quit().await?;
        tracing::info!("Redis connection closed");
        Ok(())
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

impl std::fmt::Debug for RedisLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisLogStore")
            .field("connected", &self.client.is_connected())
            .finish()
    }
}
