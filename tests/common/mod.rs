#![allow(dead_code)]

pub mod cli;

use jira_views::model::{
    DragOperation, Filter, FilterType, IssueDocument, OperationKind, Section, View,
};
use serde_json::{Value, json};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test logging once per test binary.
pub fn init_test_logging() {
    INIT.call_once(|| {
        jira_views::logging::init_test_logging();
    });
}

/// An issue with the given key and fields.
pub fn issue(key: &str, fields: Value) -> IssueDocument {
    serde_json::from_value(json!({
        "id": format!("id-{key}"),
        "key": key,
        "self": format!("https://example.atlassian.net/rest/api/2/issue/{key}"),
        "fields": fields,
    }))
    .expect("issue json")
}

pub fn filter(field: &str, filter_type: FilterType, pattern: &str) -> Filter {
    Filter::new(field, filter_type, pattern)
}

pub fn op(kind: OperationKind, field: &str, value: &str) -> DragOperation {
    DragOperation::new(kind, field, value)
}

/// A three-column board over `project = ABC`:
///
/// - "To Do": status regex `to do|open`, leaving removes the `${value}` label
/// - "Doing": status regex `progress`, entering adds the `${value}` label
/// - "Done": status regex `done` or label `shipped`, entering sets the
///   resolution label list to `[${value}]`
pub fn board_view() -> View {
    let todo = Section::new("To Do")
        .with_requirement_added(filter("status.name", FilterType::Regex, "to do|open"))
        .with_drag_out(vec![op(OperationKind::Remove, "labels", "${value}")]);
    let doing = Section::new("Doing")
        .with_requirement_added(filter("status.name", FilterType::Regex, "progress"))
        .with_drag_in(vec![op(OperationKind::Add, "labels", "${value}")]);
    let done = Section::new("Done")
        .with_requirement_added(filter("status.name", FilterType::Regex, "done"))
        .with_requirement_added(filter("labels", FilterType::Includes, "shipped"))
        .with_drag_in(vec![op(OperationKind::Set, "labels", "${value}")]);

    let mut view = View::new("Board", "project = ABC")
        .with_section_added(todo)
        .with_section_added(doing)
        .with_section_added(done);
    view.id = "view-board".to_string();
    view
}

/// A view grouping issues by assignee display name.
pub fn people_view() -> View {
    let people = Section::new("People")
        .with_requirement_added(filter("assignee.displayName", FilterType::Unique, ""))
        .with_drag_in(vec![op(OperationKind::Set, "assignee.displayName", "${value}")]);
    let mut view = View::new("People", "project = ABC").with_section_added(people);
    view.id = "view-people".to_string();
    view
}

/// Preferences JSON as an older client wrote it: no drag lists, no filter
/// types, selection stored by id.
pub fn legacy_preferences() -> Value {
    json!({
        "selectedViewId": "view-legacy",
        "theme": "dark",
        "views": [{
            "id": "view-legacy",
            "name": "Legacy",
            "icon": "",
            "direction": "horizontal",
            "allIssuesJql": "project = OLD",
            "sections": [{
                "id": "section-done",
                "name": "Done",
                "requirements": [
                    {"id": "filter-1", "fieldName": "status.name", "filterRegExpString": "done"}
                ]
            }]
        }]
    })
}
