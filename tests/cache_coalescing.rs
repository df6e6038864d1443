//! Cache coordinator behaviour against the SQLite snapshot store and a
//! counting tracker.

mod common;

use common::{board_view, init_test_logging, issue};
use jira_views::ViewsError;
use jira_views::cache::{ActiveView, IssueCache, IssueSource};
use jira_views::drag::FieldPatch;
use jira_views::error::{FetchError, Result};
use jira_views::model::{Credentials, IssueDocument, View};
use jira_views::storage::{SnapshotStore, SqliteSnapshotStore};
use jira_views::tracker::{IssueTracker, SearchPage};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

/// Serves `total` issues per search, slowly, counting page requests.
struct CountingTracker {
    total: usize,
    label: &'static str,
    pages: AtomicUsize,
    fail: bool,
}

impl CountingTracker {
    fn new(total: usize, label: &'static str) -> Self {
        Self {
            total,
            label,
            pages: AtomicUsize::new(0),
            fail: false,
        }
    }
}

impl IssueTracker for CountingTracker {
    async fn search_page(
        &self,
        jql: &str,
        start_at: usize,
        max_results: usize,
        _credentials: &Credentials,
    ) -> Result<SearchPage> {
        self.pages.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail {
            return Err(FetchError::new(jql, "503 Service Unavailable").into());
        }
        let end = (start_at + max_results).min(self.total);
        Ok(SearchPage {
            start_at,
            max_results,
            total: self.total,
            issues: (start_at..end)
                .map(|n| issue(&format!("ABC-{n}"), json!({"summary": self.label})))
                .collect(),
        })
    }

    async fn fetch_issue(&self, key: &str, _credentials: &Credentials) -> Result<IssueDocument> {
        Err(FetchError::new(key, "not used").into())
    }

    async fn apply_field_patch(
        &self,
        _key: &str,
        _patch: &FieldPatch,
        _credentials: &Credentials,
    ) -> Result<bool> {
        Ok(false)
    }
}

fn sqlite_cache(dir: &TempDir) -> IssueCache<SqliteSnapshotStore> {
    let store = SqliteSnapshotStore::open(&dir.path().join("cache.db")).expect("open cache");
    IssueCache::new(Arc::new(store))
}

#[tokio::test(start_paused = true)]
async fn concurrent_first_loads_issue_one_search() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);
    let tracker = Arc::new(CountingTracker::new(3, "fresh"));
    let view = board_view();

    let (a, b, c) = tokio::join!(
        cache.get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), |_| {}),
        cache.get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), |_| {}),
        cache.get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), |_| {}),
    );

    assert_eq!(tracker.pages.load(Ordering::SeqCst), 1);
    for result in [a, b, c] {
        let loaded = result.unwrap();
        assert_eq!(loaded.source, IssueSource::Remote);
        assert_eq!(loaded.issues.len(), 3);
    }
    assert_eq!(cache.store().count().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn cached_view_returns_immediately_and_updates_once() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);
    let view = board_view();
    cache
        .store()
        .put(&view.id, &[issue("ABC-0", json!({"summary": "stale"}))])
        .unwrap();

    let tracker = Arc::new(CountingTracker::new(2, "fresh"));
    let updates = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = oneshot::channel();
    let counter = Arc::clone(&updates);

    let served = cache
        .get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), move |update| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(update);
        })
        .await
        .unwrap();

    assert_eq!(served.source, IssueSource::Snapshot);
    assert!(served.fetched_at.is_some());
    assert_eq!(served.issues[0].fields["summary"], "stale");
    assert_eq!(tracker.pages.load(Ordering::SeqCst), 0);

    let fresh = rx.await.unwrap().unwrap();
    assert_eq!(fresh.len(), 2);
    assert_eq!(updates.load(Ordering::SeqCst), 1);
    assert_eq!(tracker.pages.load(Ordering::SeqCst), 1);

    let stored = cache.store().get(&view.id).unwrap().unwrap();
    assert_eq!(stored.issues[0].fields["summary"], "fresh");
    assert!(!cache.is_refreshing(&view.id));
}

#[tokio::test(start_paused = true)]
async fn first_load_failure_is_surfaced_to_every_waiter() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);
    let mut tracker = CountingTracker::new(3, "fresh");
    tracker.fail = true;
    let tracker = Arc::new(tracker);
    let view = board_view();

    let (a, b) = tokio::join!(
        cache.get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), |_| {}),
        cache.get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), |_| {}),
    );

    assert_eq!(tracker.pages.load(Ordering::SeqCst), 1);
    for result in [a, b] {
        let err = result.unwrap_err();
        assert!(matches!(err, ViewsError::Fetch(ref e) if e.message.contains("503")));
    }
    assert!(cache.store().get(&view.id).unwrap().is_none());
    assert!(cache.in_flight_keys().is_empty());
}

#[tokio::test]
async fn blank_query_fails_before_fetching() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);
    let tracker = Arc::new(CountingTracker::new(1, "fresh"));
    let view = View::new("Empty", "");

    let err = cache
        .get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ViewsError::MissingJql { .. }));
    assert_eq!(tracker.pages.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn late_results_for_previous_view_are_discarded() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let cache = sqlite_cache(&dir);
    let tracker = Arc::new(CountingTracker::new(1, "fresh"));
    let active = ActiveView::new();
    let view = board_view();

    let ticket = active.select(&view.id);
    let pending = cache.get_view_issues(&view, Arc::clone(&tracker), Credentials::default(), |_| {});
    active.select("view-other");
    let loaded = pending.await.unwrap();

    assert_eq!(loaded.issues.len(), 1);
    assert!(!active.is_current(&ticket));
}
