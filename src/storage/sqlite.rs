//! `SQLite` snapshot storage.

use crate::error::Result;
use crate::model::IssueDocument;
use crate::storage::schema::apply_schema;
use crate::storage::{IssueSnapshot, SnapshotStore};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite-backed issue snapshot store.
///
/// The connection sits behind a mutex so the store can be shared with
/// background refresh tasks.
#[derive(Debug)]
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    /// Open (or create) the snapshot database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open with an optional busy timeout (ms).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema application fails.
    pub fn open_with_timeout(path: &Path, lock_timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;
        if let Some(timeout) = lock_timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        }
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-written row:
        // every write is a single statement.
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Number of stored snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM issue_snapshots", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn get(&self, key: &str) -> Result<Option<IssueSnapshot>> {
        let row: Option<(String, String)> = self
            .conn()
            .query_row(
                "SELECT issues, fetched_at FROM issue_snapshots WHERE cache_key = ?",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((issues_json, fetched_at)) = row else {
            return Ok(None);
        };
        let issues: Vec<IssueDocument> = serde_json::from_str(&issues_json)?;
        let fetched_at = DateTime::parse_from_rfc3339(&fetched_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|err| {
                tracing::warn!(key, error = %err, "Unparseable snapshot timestamp");
                DateTime::<Utc>::MIN_UTC
            });
        Ok(Some(IssueSnapshot { issues, fetched_at }))
    }

    fn put(&self, key: &str, issues: &[IssueDocument]) -> Result<()> {
        let payload = serde_json::to_string(issues)?;
        let count = i64::try_from(issues.len()).unwrap_or(i64::MAX);
        self.conn().execute(
            "INSERT INTO issue_snapshots (cache_key, issues, issue_count, fetched_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(cache_key) DO UPDATE SET
                issues = excluded.issues,
                issue_count = excluded.issue_count,
                fetched_at = excluded.fetched_at",
            rusqlite::params![key, payload, count, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(key, count, "Stored issue snapshot");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let deleted = self
            .conn()
            .execute("DELETE FROM issue_snapshots WHERE cache_key = ?", [key])?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn issue(key: &str) -> IssueDocument {
        serde_json::from_value(json!({"id": "1", "key": key, "fields": {"summary": key}}))
            .unwrap()
    }

    #[test]
    fn put_then_get_round_trips_documents() {
        let store = SqliteSnapshotStore::open_memory().unwrap();
        store.put("view-1", &[issue("ABC-1"), issue("ABC-2")]).unwrap();

        let snapshot = store.get("view-1").unwrap().unwrap();
        assert_eq!(snapshot.issues.len(), 2);
        assert_eq!(snapshot.issues[1].key, "ABC-2");
        assert!(snapshot.fetched_at <= Utc::now());
        assert!(store.get("view-2").unwrap().is_none());
    }

    #[test]
    fn put_replaces_existing_snapshot() {
        let store = SqliteSnapshotStore::open_memory().unwrap();
        store.put("view-1", &[issue("ABC-1")]).unwrap();
        store.put("view-1", &[issue("ABC-9")]).unwrap();

        let snapshot = store.get("view-1").unwrap().unwrap();
        assert_eq!(snapshot.issues.len(), 1);
        assert_eq!(snapshot.issues[0].key, "ABC-9");
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn remove_reports_whether_a_row_existed() {
        let store = SqliteSnapshotStore::open_memory().unwrap();
        store.put("view-1", &[]).unwrap();
        assert!(store.remove("view-1").unwrap());
        assert!(!store.remove("view-1").unwrap());
    }

    #[test]
    fn snapshots_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.db");
        {
            let store = SqliteSnapshotStore::open(&path).unwrap();
            store.put("view-1", &[issue("ABC-1")]).unwrap();
        }
        let store = SqliteSnapshotStore::open(&path).unwrap();
        assert_eq!(store.get("view-1").unwrap().unwrap().issues[0].key, "ABC-1");
    }
}
