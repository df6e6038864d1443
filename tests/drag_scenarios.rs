//! Drag scenarios: board moves, unique-bucket moves and the drag service.

mod common;

use common::{board_view, init_test_logging, issue, people_view};
use jira_views::ViewsError;
use jira_views::drag::{DragService, DropOutcome, DropTarget, FieldPatch, compute_drop};
use jira_views::error::{FetchError, Result};
use jira_views::model::{Credentials, IssueDocument};
use jira_views::tracker::{IssueTracker, SearchPage};
use serde_json::json;
use std::sync::Mutex;

/// A tracker holding one issue in memory and recording submitted patches.
struct FakeTracker {
    current: IssueDocument,
    accept: bool,
    fetches: Mutex<usize>,
    submitted: Mutex<Vec<FieldPatch>>,
}

impl FakeTracker {
    fn new(current: IssueDocument) -> Self {
        Self {
            current,
            accept: true,
            fetches: Mutex::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }
}

impl IssueTracker for FakeTracker {
    async fn search_page(
        &self,
        _jql: &str,
        start_at: usize,
        max_results: usize,
        _credentials: &Credentials,
    ) -> Result<SearchPage> {
        Ok(SearchPage {
            start_at,
            max_results,
            total: 1,
            issues: vec![self.current.clone()],
        })
    }

    async fn fetch_issue(&self, key: &str, _credentials: &Credentials) -> Result<IssueDocument> {
        *self.fetches.lock().unwrap() += 1;
        if key == self.current.key {
            Ok(self.current.clone())
        } else {
            Err(FetchError::new(key, "issue does not exist").into())
        }
    }

    async fn apply_field_patch(
        &self,
        _key: &str,
        patch: &FieldPatch,
        _credentials: &Credentials,
    ) -> Result<bool> {
        self.submitted.lock().unwrap().push(patch.clone());
        Ok(self.accept)
    }
}

#[tokio::test]
async fn todo_to_doing_swaps_labels() {
    init_test_logging();
    let view = board_view();
    let stale = issue("ABC-1", json!({"labels": ["To Do"]}));

    let patch = compute_drop(
        &stale,
        view.section("To Do"),
        view.section("Doing").unwrap(),
        "To Do",
        "Doing",
        || async { Ok(issue("ABC-1", json!({"labels": ["To Do", "reviewed"]}))) },
    )
    .await
    .unwrap();

    assert_eq!(patch.key, "ABC-1");
    assert_eq!(patch.id, "id-ABC-1");
    assert_eq!(
        patch.update_body(),
        json!({"fields": {"labels": ["reviewed", "Doing"]}})
    );
}

#[tokio::test]
async fn dropping_into_current_state_is_a_no_op() {
    init_test_logging();
    let view = board_view();
    let done = issue("ABC-1", json!({"labels": ["Done"]}));

    let patch = compute_drop(
        &done,
        None,
        view.section("Done").unwrap(),
        "",
        "Done",
        || async { Ok(issue("ABC-1", json!({"labels": ["Done"]}))) },
    )
    .await
    .unwrap();
    assert!(patch.is_empty());
}

#[tokio::test]
async fn unique_bucket_name_is_substituted() {
    init_test_logging();
    let view = people_view();
    let tracker = FakeTracker::new(issue("ABC-7", json!({"assignee": {"displayName": "Ann"}})));
    let service = DragService::new(tracker, Credentials::default());

    let outcome = service
        .move_issue(
            &view,
            &issue("ABC-7", json!({})),
            Some(DropTarget::bucket("People", "Ann")),
            DropTarget::bucket("People", "Bob"),
        )
        .await
        .unwrap();

    let DropOutcome::Applied(patch) = outcome else {
        panic!("expected an applied drop");
    };
    assert_eq!(
        patch.update_body(),
        json!({"fields": {"assignee": {"displayName": "Bob"}}})
    );
    assert_eq!(service.tracker().submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unchanged_drop_is_not_submitted() {
    init_test_logging();
    let view = board_view();
    let tracker = FakeTracker::new(issue("ABC-1", json!({"labels": ["Done"]})));
    let service = DragService::new(tracker, Credentials::default());

    let outcome = service
        .move_issue(&view, &issue("ABC-1", json!({})), None, DropTarget::section("Done"))
        .await
        .unwrap();

    assert_eq!(outcome, DropOutcome::Unchanged);
    assert_eq!(*service.tracker().fetches.lock().unwrap(), 1);
    assert!(service.tracker().submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_update_is_an_error() {
    init_test_logging();
    let view = board_view();
    let mut tracker = FakeTracker::new(issue("ABC-1", json!({"labels": []})));
    tracker.accept = false;
    let service = DragService::new(tracker, Credentials::default());

    let err = service
        .move_issue(&view, &issue("ABC-1", json!({})), None, DropTarget::section("Doing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ViewsError::Update { ref key, .. } if key == "ABC-1"));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test]
async fn fetch_failure_propagates_before_any_update() {
    init_test_logging();
    let view = board_view();
    let service = DragService::new(
        FakeTracker::new(issue("ABC-1", json!({}))),
        Credentials::default(),
    );

    let err = service
        .move_issue(&view, &issue("ABC-404", json!({})), None, DropTarget::section("Doing"))
        .await
        .unwrap_err();
    assert!(matches!(err, ViewsError::Fetch(_)));
    assert!(service.tracker().submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_section_fails_fast() {
    init_test_logging();
    let view = board_view();
    let service = DragService::new(
        FakeTracker::new(issue("ABC-1", json!({}))),
        Credentials::default(),
    );

    let err = service
        .move_issue(&view, &issue("ABC-1", json!({})), None, DropTarget::section("Nowhere"))
        .await
        .unwrap_err();
    assert!(matches!(err, ViewsError::SectionNotFound { ref section, .. } if section == "Nowhere"));
    assert_eq!(*service.tracker().fetches.lock().unwrap(), 0);
}
