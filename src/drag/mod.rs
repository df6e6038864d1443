//! Drag mutation engine.
//!
//! Moving an issue from one section to another runs the source section's
//! `dragOut` operations and then the destination's `dragIn` operations
//! against a freshly fetched copy of the issue. Each operation writes its
//! result back into that working copy, so later operations see the effect
//! of earlier ones. The accumulated `FieldPatch` holds only the fields that
//! actually changed.

use crate::error::{Result, ViewsError};
use crate::model::{Credentials, DragOperation, IssueDocument, OperationKind, Section, View};
use crate::path::{patch_document, resolve, set_at_path};
use crate::tracker::IssueTracker;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use tracing::{debug, info, warn};

/// The shape of a field value as far as drag operations are concerned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Absent,
    Text(&'a str),
    List(&'a [Value]),
    /// Numbers, booleans, objects and `null`: drag operations leave these alone.
    Unsupported(&'a Value),
}

impl<'a> FieldValue<'a> {
    #[must_use]
    pub fn of(value: Option<&'a Value>) -> Self {
        match value {
            None => Self::Absent,
            Some(Value::String(text)) => Self::Text(text),
            Some(Value::Array(items)) => Self::List(items),
            Some(other) => Self::Unsupported(other),
        }
    }
}

/// Minimal field update for one issue, in the tracker's nested update shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FieldPatch {
    pub id: String,
    pub key: String,
    pub fields: Map<String, Value>,
}

impl FieldPatch {
    /// An empty patch tagged with the issue's id and key.
    #[must_use]
    pub fn for_issue(issue: &IssueDocument) -> Self {
        Self {
            id: issue.id.clone(),
            key: issue.key.clone(),
            fields: Map::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Merge `other` into this patch; on collision `other` wins.
    ///
    /// Nested objects merge key by key so two operations on sibling
    /// sub-fields both survive. This deliberately differs from a plain
    /// top-level overwrite, which would keep only the later sub-field.
    pub fn merge(&mut self, other: Self) {
        if self.id.is_empty() {
            self.id = other.id;
        }
        if self.key.is_empty() {
            self.key = other.key;
        }
        merge_fields(&mut self.fields, other.fields);
    }

    /// Request body for the tracker's edit-issue endpoint.
    #[must_use]
    pub fn update_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("fields".to_string(), Value::Object(self.fields.clone()));
        Value::Object(body)
    }
}

fn merge_fields(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, incoming) in source {
        match (target.get_mut(&key), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_fields(existing, incoming);
            }
            (_, incoming) => {
                target.insert(key, incoming);
            }
        }
    }
}

/// Compute the new value for a field, or `None` when nothing changes.
#[must_use]
pub fn apply_operation(kind: OperationKind, current: FieldValue<'_>, value: &str) -> Option<Value> {
    match current {
        FieldValue::List(items) => apply_to_list(kind, items, value),
        FieldValue::Text(text) => apply_to_text(kind, text, value),
        FieldValue::Absent | FieldValue::Unsupported(_) => None,
    }
}

fn apply_to_list(kind: OperationKind, items: &[Value], value: &str) -> Option<Value> {
    match kind {
        OperationKind::Add => {
            if items.iter().any(|item| item.as_str() == Some(value)) {
                return None;
            }
            let mut next = items.to_vec();
            next.push(Value::String(value.to_string()));
            Some(Value::Array(next))
        }
        OperationKind::Remove => {
            let lowered = value.to_lowercase();
            let next: Vec<Value> = items
                .iter()
                .filter(|item| {
                    !item
                        .as_str()
                        .is_some_and(|s| s == value || s.to_lowercase() == lowered)
                })
                .cloned()
                .collect();
            (next.len() != items.len()).then_some(Value::Array(next))
        }
        OperationKind::Set => {
            if items.len() == 1 && items[0].as_str() == Some(value) {
                return None;
            }
            Some(Value::Array(vec![Value::String(value.to_string())]))
        }
    }
}

fn apply_to_text(kind: OperationKind, text: &str, value: &str) -> Option<Value> {
    match kind {
        OperationKind::Add => {
            (!text.contains(value)).then(|| Value::String(format!("{text}{value}")))
        }
        OperationKind::Remove => {
            if value.is_empty() {
                return None;
            }
            let pattern = RegexBuilder::new(&regex::escape(value))
                .case_insensitive(true)
                .build()
                .ok()?;
            let next = pattern.replacen(text, 1, "");
            (next != text).then(|| Value::String(next.into_owned()))
        }
        OperationKind::Set => (text != value).then(|| Value::String(value.to_string())),
    }
}

/// Apply one drag operation to the working issue.
///
/// `substitution` replaces `${value}` in the operation's value. On change,
/// the issue's fields are updated in place and the returned patch carries
/// the new value; otherwise the patch is empty.
pub fn perform_operation(
    operation: &DragOperation,
    issue: &mut IssueDocument,
    substitution: &str,
) -> FieldPatch {
    let mut patch = FieldPatch::for_issue(issue);
    let value = operation.substituted_value(substitution);
    let current = resolve(issue, &operation.field_name);
    let field_value = FieldValue::of(current);

    if let FieldValue::Unsupported(unsupported) = field_value {
        warn!(
            issue = %issue.key,
            field = %operation.field_name,
            kind = value_kind(unsupported),
            "Drag operations only apply to text and list fields"
        );
    }

    let Some(next) = apply_operation(operation.operation, field_value, &value) else {
        debug!(
            issue = %issue.key,
            field = %operation.field_name,
            operation = %operation.operation,
            "Drag operation already satisfied"
        );
        return patch;
    };

    debug!(
        issue = %issue.key,
        field = %operation.field_name,
        operation = %operation.operation,
        value = %value,
        "Drag operation changed field"
    );
    set_at_path(&mut issue.fields, &operation.field_name, next.clone());
    patch.fields = patch_document(&operation.field_name, next);
    patch
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Run `from`'s `dragOut` then `to`'s `dragIn` against `working`.
///
/// `working` is mutated in place and should be a fresh copy of the issue.
pub fn plan_drop(
    working: &mut IssueDocument,
    from: Option<&Section>,
    to: &Section,
    from_name: &str,
    to_name: &str,
) -> FieldPatch {
    let mut changes = FieldPatch::for_issue(working);
    if let Some(from) = from {
        for operation in &from.drag_out {
            changes.merge(perform_operation(operation, working, from_name));
        }
    }
    for operation in &to.drag_in {
        changes.merge(perform_operation(operation, working, to_name));
    }
    changes
}

/// Compute the patch for dropping `original` into `to`.
///
/// `fetch_fresh` supplies the current server state of the issue; operations
/// run against that copy, never against `original`, so concurrent remote
/// edits are not overwritten with stale values.
///
/// # Errors
///
/// Returns the fetch error if the fresh issue cannot be loaded.
pub async fn compute_drop<F, Fut>(
    original: &IssueDocument,
    from: Option<&Section>,
    to: &Section,
    from_name: &str,
    to_name: &str,
    fetch_fresh: F,
) -> Result<FieldPatch>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<IssueDocument>>,
{
    let mut fresh = fetch_fresh().await?;
    if fresh.key.is_empty() {
        fresh.key.clone_from(&original.key);
    }
    if fresh.id.is_empty() {
        fresh.id.clone_from(&original.id);
    }
    Ok(plan_drop(&mut fresh, from, to, from_name, to_name))
}

/// One end of a drag: the section whose rules apply and the bucket name
/// substituted for `${value}`.
///
/// The two differ for `Unique` buckets, where the bucket is named after a
/// field value rather than the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget<'a> {
    /// Section name or id.
    pub section: &'a str,
    pub bucket: &'a str,
}

impl<'a> DropTarget<'a> {
    /// A target whose bucket is the section itself.
    #[must_use]
    pub const fn section(name: &'a str) -> Self {
        Self {
            section: name,
            bucket: name,
        }
    }

    #[must_use]
    pub const fn bucket(section: &'a str, bucket: &'a str) -> Self {
        Self { section, bucket }
    }
}

/// What happened when an issue was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Every rule was already satisfied; nothing was sent.
    Unchanged,
    /// The patch was accepted by the tracker.
    Applied(FieldPatch),
}

/// Drives a drag end to end: fetch fresh state, compute, submit.
#[derive(Debug)]
pub struct DragService<T> {
    tracker: T,
    credentials: Credentials,
}

impl<T: IssueTracker> DragService<T> {
    #[must_use]
    pub const fn new(tracker: T, credentials: Credentials) -> Self {
        Self {
            tracker,
            credentials,
        }
    }

    #[must_use]
    pub const fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Move `issue` within `view` and submit the resulting patch.
    ///
    /// # Errors
    ///
    /// Returns `SectionNotFound` for unknown sections, the fetch error when
    /// fresh state cannot be loaded, and `Update` when the tracker rejects
    /// the patch.
    pub async fn move_issue(
        &self,
        view: &View,
        issue: &IssueDocument,
        from: Option<DropTarget<'_>>,
        to: DropTarget<'_>,
    ) -> Result<DropOutcome> {
        let from_section = from
            .map(|target| find_section(view, target.section))
            .transpose()?;
        let to_section = find_section(view, to.section)?;

        let patch = compute_drop(
            issue,
            from_section,
            to_section,
            from.map_or("", |target| target.bucket),
            to.bucket,
            || self.tracker.fetch_issue(&issue.key, &self.credentials),
        )
        .await?;

        if patch.is_empty() {
            debug!(issue = %issue.key, to = %to.bucket, "Drop produced no changes");
            return Ok(DropOutcome::Unchanged);
        }

        let accepted = self
            .tracker
            .apply_field_patch(&issue.key, &patch, &self.credentials)
            .await?;
        if !accepted {
            return Err(ViewsError::Update {
                key: issue.key.clone(),
                reason: "tracker did not accept the field update".to_string(),
            });
        }

        info!(
            issue = %issue.key,
            to = %to.bucket,
            fields = ?patch.fields.keys().collect::<Vec<_>>(),
            "Applied drop"
        );
        Ok(DropOutcome::Applied(patch))
    }
}

/// Look up a section of `view` by name or id.
///
/// # Errors
///
/// Returns `SectionNotFound` when the view has no such section.
pub fn find_section<'v>(view: &'v View, name_or_id: &str) -> Result<&'v Section> {
    view.section(name_or_id)
        .ok_or_else(|| ViewsError::SectionNotFound {
            view: view.name.clone(),
            section: name_or_id.to_string(),
        })
}
