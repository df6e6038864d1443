//! View/issue cache coordinator.
//!
//! `IssueCache` serves a view's last stored issue snapshot immediately and
//! refreshes it in the background (stale-while-revalidate). Without a
//! snapshot the caller waits for the fetch and sees its error.
//!
//! At most one fetch per cache key is in flight. Callers that arrive while
//! a fetch is running attach to it and receive the same result or error.
//! In-flight fetches are spawned onto the Tokio runtime so they settle even
//! if every waiter goes away; the in-flight marker is cleared exactly once
//! when the fetch settles.

use crate::error::{FetchError, Result, ViewsError};
use crate::model::{Credentials, IssueDocument, View};
use crate::storage::SnapshotStore;
use crate::tracker::{IssueTracker, SearchRequest};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

type FetchOutput = std::result::Result<Arc<Vec<IssueDocument>>, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutput>>;

/// Result delivered to a background-update callback.
pub type BackgroundUpdate = std::result::Result<Vec<IssueDocument>, FetchError>;

struct InFlight {
    generation: u64,
    fetch: SharedFetch,
}

type InFlightMap = HashMap<String, InFlight>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight marker for one fetch when dropped.
struct InFlightGuard {
    in_flight: Arc<Mutex<InFlightMap>>,
    key: String,
    generation: u64,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut map = lock(&self.in_flight);
        if map
            .get(&self.key)
            .is_some_and(|entry| entry.generation == self.generation)
        {
            map.remove(&self.key);
        }
    }
}

/// Where the issues returned by `get_issues` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSource {
    /// A stored snapshot; a background refresh was started.
    Snapshot,
    /// A completed remote fetch.
    Remote,
}

/// Issues returned to a foreground caller.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedIssues {
    pub issues: Vec<IssueDocument>,
    pub source: IssueSource,
    /// When the snapshot was stored; `None` for remote results.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Cache service for view issue lists. Construct once and share by cloning.
pub struct IssueCache<S> {
    store: Arc<S>,
    in_flight: Arc<Mutex<InFlightMap>>,
    generation: Arc<AtomicU64>,
}

impl<S> Clone for IssueCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            in_flight: Arc::clone(&self.in_flight),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<S> std::fmt::Debug for IssueCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueCache")
            .field("in_flight", &self.in_flight_keys())
            .finish_non_exhaustive()
    }
}

impl<S> IssueCache<S> {
    /// Whether a fetch for `key` is currently in flight.
    #[must_use]
    pub fn is_refreshing(&self, key: &str) -> bool {
        lock(&self.in_flight).contains_key(key)
    }

    /// Keys with a fetch in flight, sorted.
    #[must_use]
    pub fn in_flight_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.in_flight).keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl<S: SnapshotStore + 'static> IssueCache<S> {
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Attach to the in-flight fetch for `key`, or start one with `fetch`.
    ///
    /// Must be called from within a Tokio runtime.
    fn coalesced_fetch<F, Fut>(&self, key: &str, fetch: F) -> SharedFetch
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<Vec<IssueDocument>, FetchError>> + Send + 'static,
    {
        let shared = {
            let mut map = lock(&self.in_flight);
            if let Some(existing) = map.get(key) {
                debug!(key, "Joining in-flight fetch");
                return existing.fetch.clone();
            }

            let generation = self.generation.fetch_add(1, Ordering::Relaxed);
            let guard = InFlightGuard {
                in_flight: Arc::clone(&self.in_flight),
                key: key.to_string(),
                generation,
            };
            let store = Arc::clone(&self.store);
            let owned_key = key.to_string();

            let shared = async move {
                let _guard = guard;
                let issues = Arc::new(fetch().await?);
                if let Err(err) = store.put(&owned_key, &issues) {
                    warn!(key = %owned_key, error = %err, "Failed to persist issue snapshot");
                }
                Ok(issues)
            }
            .boxed()
            .shared();

            map.insert(
                key.to_string(),
                InFlight {
                    generation,
                    fetch: shared.clone(),
                },
            );
            shared
        };

        debug!(key, "Started fetch");
        tokio::spawn(shared.clone());
        shared
    }

    /// Issues for `view`, stale-while-revalidate.
    ///
    /// With a stored snapshot this returns it at once and refreshes in the
    /// background; `on_background_update` then receives the refresh result
    /// exactly once. Without a snapshot it waits for `fetch`, and the
    /// callback is not used.
    ///
    /// # Errors
    ///
    /// Returns the fetch error when there is no snapshot to fall back on.
    pub async fn get_issues<F, Fut, U>(
        &self,
        view: &View,
        fetch: F,
        on_background_update: U,
    ) -> Result<CachedIssues>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<Vec<IssueDocument>, FetchError>> + Send + 'static,
        U: FnOnce(BackgroundUpdate) + Send + 'static,
    {
        let key = view.id.as_str();
        let snapshot = self.store.get(key).unwrap_or_else(|err| {
            warn!(key, error = %err, "Snapshot lookup failed; fetching instead");
            None
        });

        if let Some(snapshot) = snapshot {
            debug!(key, count = snapshot.issues.len(), "Serving stored snapshot");
            let refresh = self.coalesced_fetch(key, fetch);
            let owned_key = key.to_string();
            tokio::spawn(async move {
                let result = refresh.await;
                match &result {
                    Ok(issues) => info!(key = %owned_key, count = issues.len(), "Background refresh complete"),
                    Err(err) => warn!(key = %owned_key, error = %err, "Background refresh failed"),
                }
                on_background_update(result.map(|issues| issues.as_ref().clone()));
            });
            return Ok(CachedIssues {
                issues: snapshot.issues,
                source: IssueSource::Snapshot,
                fetched_at: Some(snapshot.fetched_at),
            });
        }

        let issues = self.coalesced_fetch(key, fetch).await?;
        info!(key, count = issues.len(), "Fetched issues");
        Ok(CachedIssues {
            issues: issues.as_ref().clone(),
            source: IssueSource::Remote,
            fetched_at: None,
        })
    }

    /// Fetch `view`'s issues now, joining any fetch already in flight.
    ///
    /// # Errors
    ///
    /// Returns the fetch error.
    pub async fn refresh<F, Fut>(&self, view: &View, fetch: F) -> Result<Vec<IssueDocument>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<Vec<IssueDocument>, FetchError>> + Send + 'static,
    {
        let issues = self.coalesced_fetch(&view.id, fetch).await?;
        Ok(issues.as_ref().clone())
    }

    /// Drop the stored snapshot for `view_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub fn invalidate(&self, view_id: &str) -> Result<bool> {
        self.store.remove(view_id)
    }

    /// `get_issues` backed by a tracker search for the view's query.
    ///
    /// # Errors
    ///
    /// Returns `MissingJql` before any fetch when the view has no query,
    /// otherwise as `get_issues`.
    pub async fn get_view_issues<T, U>(
        &self,
        view: &View,
        tracker: Arc<T>,
        credentials: Credentials,
        on_background_update: U,
    ) -> Result<CachedIssues>
    where
        T: IssueTracker + 'static,
        U: FnOnce(BackgroundUpdate) + Send + 'static,
    {
        let request = SearchRequest::for_view(view)?;
        let fetch = move || async move {
            request
                .execute(tracker.as_ref(), &credentials)
                .await
                .map_err(|err| into_fetch_error(err, &request.jql))
        };
        self.get_issues(view, fetch, on_background_update).await
    }
}

fn into_fetch_error(err: ViewsError, target: &str) -> FetchError {
    match err {
        ViewsError::Fetch(fetch) => fetch,
        other => FetchError::new(target, other.to_string()),
    }
}

/// Identifies the view a request was made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    view_id: String,
}

impl RefreshTicket {
    #[must_use]
    pub fn view_id(&self) -> &str {
        &self.view_id
    }
}

/// The view the user is currently looking at.
///
/// Results that resolve after the user navigated away are discarded by
/// checking the ticket taken at request time.
#[derive(Debug, Clone, Default)]
pub struct ActiveView {
    current: Arc<Mutex<Option<String>>>,
}

impl ActiveView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `view_id` current and return a ticket for requests made now.
    pub fn select(&self, view_id: &str) -> RefreshTicket {
        *lock(&self.current) = Some(view_id.to_string());
        RefreshTicket {
            view_id: view_id.to_string(),
        }
    }

    /// A ticket for the current view, if any.
    #[must_use]
    pub fn ticket(&self) -> Option<RefreshTicket> {
        lock(&self.current).clone().map(|view_id| RefreshTicket { view_id })
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        lock(&self.current).clone()
    }

    /// Whether results for `ticket` should still be shown.
    #[must_use]
    pub fn is_current(&self, ticket: &RefreshTicket) -> bool {
        lock(&self.current).as_deref() == Some(ticket.view_id.as_str())
    }
}
