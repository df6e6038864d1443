//! Remote issue tracker collaborator.
//!
//! The engine never talks HTTP itself. Callers plug in an `IssueTracker`
//! implementation; this module supplies the pagination loop and the
//! boundary checks that run before any query is issued.

use crate::drag::FieldPatch;
use crate::error::{Result, ViewsError};
use crate::model::{Credentials, IssueDocument, View};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::debug;

/// Page size used when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// One page of search results, in the tracker's paging shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub start_at: usize,
    pub max_results: usize,
    pub total: usize,
    #[serde(default)]
    pub issues: Vec<IssueDocument>,
}

/// Search, fetch and update access to a remote tracker.
pub trait IssueTracker: Send + Sync {
    /// Fetch a single page of results for `jql`.
    fn search_page(
        &self,
        jql: &str,
        start_at: usize,
        max_results: usize,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<SearchPage>> + Send;

    /// Fetch the current state of one issue.
    fn fetch_issue(
        &self,
        key: &str,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<IssueDocument>> + Send;

    /// Submit a field patch. `Ok(false)` means the tracker declined it.
    fn apply_field_patch(
        &self,
        key: &str,
        patch: &FieldPatch,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Every issue matching `jql`, following pagination.
    fn search(
        &self,
        jql: &str,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Vec<IssueDocument>>> + Send {
        collect_pages(DEFAULT_PAGE_SIZE, move |start_at, max_results| {
            self.search_page(jql, start_at, max_results, credentials)
        })
    }
}

/// Request pages until `total` is reached or the tracker returns an empty page.
///
/// # Errors
///
/// Returns the first page error; pages already received are discarded.
pub async fn collect_pages<F, Fut>(page_size: usize, mut fetch_page: F) -> Result<Vec<IssueDocument>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<SearchPage>>,
{
    let page_size = page_size.max(1);
    let mut issues: Vec<IssueDocument> = Vec::new();
    loop {
        let start_at = issues.len();
        let page = fetch_page(start_at, page_size).await?;
        let received = page.issues.len();
        issues.extend(page.issues);
        debug!(start_at, received, total = page.total, "Fetched search page");
        if received == 0 || issues.len() >= page.total {
            break;
        }
    }
    Ok(issues)
}

/// A validated search for one view's issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub view_id: String,
    pub jql: String,
    pub page_size: usize,
}

impl SearchRequest {
    /// Build the search for `view`.
    ///
    /// # Errors
    ///
    /// Returns `MissingJql` when the view has no query.
    pub fn for_view(view: &View) -> Result<Self> {
        let jql = view.all_issues_jql.trim();
        if jql.is_empty() {
            return Err(ViewsError::MissingJql {
                view: view.name.clone(),
            });
        }
        Ok(Self {
            view_id: view.id.clone(),
            jql: jql.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Run the search against `tracker`, following every page.
    ///
    /// # Errors
    ///
    /// Returns the tracker's error for the first failing page.
    pub async fn execute<T: IssueTracker + ?Sized>(
        &self,
        tracker: &T,
        credentials: &Credentials,
    ) -> Result<Vec<IssueDocument>> {
        collect_pages(self.page_size, |start_at, max_results| {
            tracker.search_page(&self.jql, start_at, max_results, credentials)
        })
        .await
    }
}
