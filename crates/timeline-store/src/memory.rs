//! In-process log store.
//!
//! Mirrors the list/set semantics of the Redis store (head insertion,
//! set members) without a server. Used by tests and by embedders that want
//! to run the pipeline without Redis. Individual keys can be marked as
//! failing to exercise partial-delivery and resolution failures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::StoreError;

#[derive(Debug, Default)]
struct MemoryState {
    lists: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    appends: usize,
    closed: bool,
}

/// Shared in-memory list store. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryLogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panicking test thread must not hide the recorded entries.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push `payload` onto the head of the list at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if `key` was marked failing and
    /// [`StoreError::Closed`] after [`MemoryLogStore::close`].
    pub fn append(&self, key: &str, payload: &str) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.closed {
            return Err(StoreError::Closed);
        }
        if state.failing.contains(key) {
            return Err(StoreError::Unavailable { key: key.to_owned() });
        }
        state
            .lists
            .entry(key.to_owned())
            .or_default()
            .push_front(payload.to_owned());
        state.appends = state.appends.saturating_add(1);
        Ok(())
    }

    /// Read every member of the set at `key`, in insertion order.
    ///
    /// # Errors
    ///
    /// Same conditions as [`MemoryLogStore::append`].
    pub fn members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let state = self.lock();
        if state.closed {
            return Err(StoreError::Closed);
        }
        if state.failing.contains(key) {
            return Err(StoreError::Unavailable { key: key.to_owned() });
        }
        Ok(state.sets.get(key).cloned().unwrap_or_default())
    }

    /// Mark the handle closed; later operations fail with
    /// [`StoreError::Closed`].
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Add `member` to the set at `key`. Duplicates are ignored.
    pub fn add_member(&self, key: &str, member: &str) {
        let mut state = self.lock();
        let set = state.sets.entry(key.to_owned()).or_default();
        if !set.iter().any(|m| m == member) {
            set.push(member.to_owned());
        }
    }

    /// Make every operation on `key` fail from now on.
    pub fn fail_key(&self, key: &str) {
        self.lock().failing.insert(key.to_owned());
    }

    /// Entries of the list at `key`, most recent first.
    pub fn entries(&self, key: &str) -> Vec<String> {
        self.lock()
            .lists
            .get(key)
            .map(|list| list.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys of every non-empty list, sorted.
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().lists.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total number of successful appends across all keys.
    pub fn append_count(&self) -> usize {
        self.lock().appends
    }
}
