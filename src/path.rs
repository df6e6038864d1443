//! Dotted field-path resolution over issue documents.
//!
//! A path such as `assignee.displayName` addresses
//! `issue.fields.assignee.displayName`: the first segment is looked up in
//! the issue's `fields` map, every later segment indexes directly into the
//! previous result. Lookups never fail; anything that cannot be followed
//! resolves to `None`.

use crate::model::IssueDocument;
use serde_json::{Map, Value};

/// Split a dotted path into its segments.
#[must_use]
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Resolve a dotted path against an issue.
#[must_use]
pub fn resolve<'a>(issue: &'a IssueDocument, path: &str) -> Option<&'a Value> {
    resolve_segments(issue, &split_path(path))
}

/// Resolve pre-split segments against an issue.
///
/// An empty segment list resolves to `None`: the document root is not a
/// field value.
#[must_use]
pub fn resolve_segments<'a, S: AsRef<str>>(
    issue: &'a IssueDocument,
    segments: &[S],
) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let root = issue.fields.get(first.as_ref())?;
    descend(root, rest)
}

fn descend<'a, S: AsRef<str>>(value: &'a Value, segments: &[S]) -> Option<&'a Value> {
    match segments.split_first() {
        None => Some(value),
        Some((head, tail)) => child(value, head.as_ref()).and_then(|next| descend(next, tail)),
    }
}

fn child<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

/// Write `value` at `path` inside an issue's field map.
///
/// Missing intermediate objects are created; a scalar standing where an
/// object is needed is replaced.
pub fn set_at_path(fields: &mut Map<String, Value>, path: &str, value: Value) {
    let segments = split_path(path);
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let Some((first, middle)) = parents.split_first() else {
        fields.insert((*last).to_string(), value);
        return;
    };

    let mut current = fields
        .entry((*first).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    for segment in middle {
        current = child_mut(current, segment);
    }
    match current {
        Value::Array(items) => {
            if let Some(slot) = last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                *slot = value;
            }
        }
        other => {
            if !other.is_object() {
                *other = Value::Object(Map::new());
            }
            if let Value::Object(map) = other {
                map.insert((*last).to_string(), value);
            }
        }
    }
}

fn child_mut<'a>(value: &'a mut Value, key: &str) -> &'a mut Value {
    let array_index = match &*value {
        Value::Array(items) => key.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };
    if array_index.is_none() && !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match (value, array_index) {
        (Value::Array(items), Some(index)) => &mut items[index],
        (Value::Object(map), _) => map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new())),
        (other, _) => other,
    }
}

/// Build the nested field-update document that sets `path` to `value`.
///
/// `assignee.accountId` becomes `{"assignee": {"accountId": value}}`.
#[must_use]
pub fn patch_document(path: &str, value: Value) -> Map<String, Value> {
    let segments = split_path(path);
    let Some((first, rest)) = segments.split_first() else {
        return Map::new();
    };
    let nested = rest.iter().rev().fold(value, |acc, segment| {
        let mut map = Map::new();
        map.insert((*segment).to_string(), acc);
        Value::Object(map)
    });
    let mut fields = Map::new();
    fields.insert((*first).to_string(), nested);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue(fields: Value) -> IssueDocument {
        serde_json::from_value(json!({"id": "1", "key": "ABC-1", "fields": fields})).unwrap()
    }

    #[test]
    fn first_hop_goes_through_fields() {
        let issue = issue(json!({"assignee": {"displayName": "Ann"}}));
        assert_eq!(resolve(&issue, "assignee.displayName"), Some(&json!("Ann")));
    }

    #[test]
    fn later_hops_do_not_go_through_fields() {
        let issue = issue(json!({"assignee": {"fields": {"displayName": "Nested"}}}));
        assert_eq!(resolve(&issue, "assignee.displayName"), None);
        assert_eq!(
            resolve(&issue, "assignee.fields.displayName"),
            Some(&json!("Nested"))
        );
    }

    #[test]
    fn missing_and_malformed_paths_resolve_to_none() {
        let issue = issue(json!({"status": null, "summary": "text"}));
        assert_eq!(resolve(&issue, "missing.path"), None);
        assert_eq!(resolve(&issue, "status.name"), None);
        assert_eq!(resolve(&issue, "summary.length"), None);
        assert_eq!(resolve(&issue, ""), None);
        assert_eq!(resolve_segments::<&str>(&issue, &[]), None);
    }

    #[test]
    fn numeric_segments_index_arrays() {
        let issue = issue(json!({"fixVersions": [{"name": "1.0"}, {"name": "2.0"}]}));
        assert_eq!(resolve(&issue, "fixVersions.1.name"), Some(&json!("2.0")));
        assert_eq!(resolve(&issue, "fixVersions.9.name"), None);
    }

    #[test]
    fn set_at_path_writes_nested_value() {
        let mut issue = issue(json!({"labels": ["a"], "assignee": {"name": "x"}}));
        set_at_path(&mut issue.fields, "labels", json!(["a", "b"]));
        set_at_path(&mut issue.fields, "assignee.name", json!("y"));
        set_at_path(&mut issue.fields, "priority.name", json!("High"));
        assert_eq!(issue.fields["labels"], json!(["a", "b"]));
        assert_eq!(issue.fields["assignee"], json!({"name": "y"}));
        assert_eq!(issue.fields["priority"], json!({"name": "High"}));
    }

    #[test]
    fn patch_document_nests_segments() {
        let patch = patch_document("assignee.accountId", json!("abc"));
        assert_eq!(Value::Object(patch), json!({"assignee": {"accountId": "abc"}}));
        let patch = patch_document("labels", json!(["a"]));
        assert_eq!(Value::Object(patch), json!({"labels": ["a"]}));
    }
}
