//! Persistence collaborators.
//!
//! - `PreferencesStore` - the opaque JSON preferences blob
//! - `SnapshotStore` - per-view issue snapshots backing the cache coordinator
//!
//! Each trait has an in-memory implementation for tests and a durable one
//! (`JsonFilePreferencesStore`, `SqliteSnapshotStore`).

mod preferences;
pub mod schema;
pub mod sqlite;

pub use preferences::{JsonFilePreferencesStore, MemoryPreferencesStore};
pub use sqlite::SqliteSnapshotStore;

use crate::error::Result;
use crate::model::{IssueDocument, UserPreferences};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Load/save access to the user's preferences blob.
pub trait PreferencesStore {
    /// Load the raw blob, or `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the blob exists but cannot be read or parsed as JSON.
    fn load(&self) -> Result<Option<Value>>;

    /// Persist preferences. Returns `false` when the store declined the write.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying write fails.
    fn save(&self, preferences: &UserPreferences) -> Result<bool>;
}

/// A stored issue list for one cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueSnapshot {
    pub issues: Vec<IssueDocument>,
    pub fetched_at: DateTime<Utc>,
}

/// Keyed issue snapshot storage.
///
/// Implementations must be shareable with background refresh tasks.
pub trait SnapshotStore: Send + Sync {
    /// Fetch the snapshot for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn get(&self, key: &str) -> Result<Option<IssueSnapshot>>;

    /// Replace the snapshot for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn put(&self, key: &str, issues: &[IssueDocument]) -> Result<()>;

    /// Drop the snapshot for `key`, returning whether one existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn remove(&self, key: &str) -> Result<bool>;
}

/// Process-local snapshot store.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<HashMap<String, IssueSnapshot>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshots(&self) -> std::sync::MutexGuard<'_, HashMap<String, IssueSnapshot>> {
        self.snapshots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &str) -> Result<Option<IssueSnapshot>> {
        Ok(self.snapshots().get(key).cloned())
    }

    fn put(&self, key: &str, issues: &[IssueDocument]) -> Result<()> {
        self.snapshots().insert(
            key.to_string(),
            IssueSnapshot {
                issues: issues.to_vec(),
                fetched_at: Utc::now(),
            },
        );
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.snapshots().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_snapshot_store_round_trips() {
        let store = MemorySnapshotStore::new();
        assert!(store.get("view-1").unwrap().is_none());

        let issue = IssueDocument::new("1", "ABC-1", serde_json::Map::new());
        store.put("view-1", std::slice::from_ref(&issue)).unwrap();
        assert_eq!(store.get("view-1").unwrap().unwrap().issues, vec![issue]);

        assert!(store.remove("view-1").unwrap());
        assert!(store.get("view-1").unwrap().is_none());
    }
}
