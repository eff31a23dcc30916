//! Error types for the store layer.
//!
//! All errors are propagated via [`StoreError`] which wraps the underlying
//! [`fred`] errors with additional context about which operation failed.

/// Errors that can occur while talking to the list store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A Redis/`Dragonfly` operation failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// A configuration error (bad URL, bad timeout).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The store refused an operation on `key`.
    #[error("store unavailable for key {key}")]
    Unavailable {
        /// Key the operation targeted.
        key: String,
    },

    /// The store handle was closed before the operation ran.
    #[error("store handle is closed")]
    Closed,
}
