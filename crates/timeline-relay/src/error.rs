//! Error types for the relay.

use timeline_core::ConfigError;
use timeline_store::StoreError;

/// Errors that can occur during relay operation.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Failed to connect to or communicate with the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),

    /// A message payload could not be parsed.
    #[error("message parse error: {0}")]
    Parse(String),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The list store could not be opened or closed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
