//! List store client for the Timeline pipeline.
//!
//! The pipeline needs exactly two things from its store: append a payload to
//! the head of a keyed list, and read the members of a keyed set (the
//! actor's followers). Feeds are never read or trimmed from here.
//!
//! # Architecture
//!
//! ```text
//! RecipientResolver --members--> LogStore --+-- RedisLogStore (fred)
//! FanoutWriter ------append----> LogStore   +-- MemoryLogStore (in-process)
//! ```
//!
//! [`LogStore`] dispatches over the concrete backends with an enum rather
//! than a trait object, since async methods are not dyn-compatible.
//!
//! # Modules
//!
//! - [`redis`] -- Redis/`Dragonfly` backend
//! - [`memory`] -- In-process backend with failure injection
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod redis;

use std::time::Duration;

// Re-export primary types for convenience.
pub use error::StoreError;
pub use memory::MemoryLogStore;
pub use redis::RedisLogStore;

/// A store handle, opened once and shared by the resolver and writer.
#[derive(Debug, Clone)]
pub enum LogStore {
    /// Redis or a Redis-compatible server.
    Redis(RedisLogStore),
    /// In-process store.
    Memory(MemoryLogStore),
}

impl LogStore {
    /// Connect to a Redis-compatible server.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the URL is invalid or the connection fails.
    pub async fn connect_redis(url: &str, command_timeout: Duration) -> Result<Self, StoreError> {
        Ok(Self::Redis(RedisLogStore::connect(url, command_timeout).await?))
    }

    /// Push `payload` onto the head of the list at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend rejects the write.
    pub async fn append(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        match self {
            Self::Redis(store) => store.append(key, payload).await,
            Self::Memory(store) => store.append(key, payload),
        }
    }

    /// Read every member of the set at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend read fails.
    pub async fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match self {
            Self::Redis(store) => store.members(key).await,
            Self::Memory(store) => store.members(key),
        }
    }

    /// Close the handle. Clones of it stop working too.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails to shut down cleanly.
    pub async fn close(&self) -> Result<(), StoreError> {
        match self {
            Self::Redis(store) => store.close().await,
            Self::Memory(store) => {
                store.close();
                Ok(())
            }
        }
    }

    /// Human-readable backend name for logging.
    pub const fn backend(&self) -> &'static str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<MemoryLogStore> for LogStore {
    fn from(store: MemoryLogStore) -> Self {
        Self::Memory(store)
    }
}

impl From<RedisLogStore> for LogStore {
    fn from(store: RedisLogStore) -> Self {
        Self::Redis(store)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_dispatch() {
        let memory = MemoryLogStore::new();
        let store = LogStore::from(memory.clone());
        assert_eq!(store.backend(), "memory");

        store.append("global:activity", "{}").await.unwrap();
        assert_eq!(memory.entries("global:activity"), vec!["{}"]);

        memory.add_member("user:id:1:followers", "2");
        assert_eq!(store.members("user:id:1:followers").await.unwrap(), vec!["2"]);

        store.close().await.unwrap();
        assert!(store.append("global:activity", "{}").await.is_err());
    }
}
