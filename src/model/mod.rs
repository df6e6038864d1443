//! Core data types for `jira_views`.
//!
//! This module defines the persisted view configuration and the issue
//! documents it operates over:
//! - `View` - A named grouping of issues into sections
//! - `Section` - A bucket within a view, with match filters and drag rules
//! - `Filter` - A single per-field matching rule
//! - `DragOperation` - A field mutation applied when an issue enters or leaves a section
//! - `IssueDocument` - An issue as returned by the tracker
//! - `UserPreferences` - The aggregate that owns every view
//!
//! All configuration types are value objects. Edits go through the
//! `with_*` functions, which return a new value and leave the receiver
//! untouched.

use crate::util::id::{IdKind, generate_id};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Layout direction of a view's sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    #[serde(alias = "Vertical")]
    Vertical,
    #[serde(alias = "Horizontal")]
    Horizontal,
}

impl Direction {
    pub const ALL: [Self; 2] = [Self::Vertical, Self::Horizontal];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            _ => Err(UnknownVariant::new("direction", s)),
        }
    }
}

/// Strategy a `Filter` uses to test a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Group by the field value itself; each distinct value becomes a bucket.
    #[serde(alias = "Unique")]
    Unique,
    /// Case-insensitive regular expression match.
    #[default]
    #[serde(alias = "Regex", alias = "regexp")]
    Regex,
    /// Array membership or substring match.
    #[serde(alias = "Includes")]
    Includes,
}

impl FilterType {
    pub const ALL: [Self; 3] = [Self::Unique, Self::Regex, Self::Includes];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unique => "unique",
            Self::Regex => "regex",
            Self::Includes => "includes",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unique" => Ok(Self::Unique),
            "regex" | "regexp" => Ok(Self::Regex),
            "includes" => Ok(Self::Includes),
            _ => Err(UnknownVariant::new("filterType", s)),
        }
    }
}

/// Kind of field mutation performed by a `DragOperation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    #[serde(alias = "Set")]
    Set,
    #[serde(alias = "Add")]
    Add,
    #[serde(alias = "Remove")]
    Remove,
}

impl OperationKind {
    pub const ALL: [Self; 3] = [Self::Set, Self::Add, Self::Remove];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Add => "add",
            Self::Remove => "remove",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "set" => Ok(Self::Set),
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(UnknownVariant::new("operation", s)),
        }
    }
}

/// A string that does not name any variant of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Placeholder substituted with the section name when a drag operation runs.
pub const VALUE_PLACEHOLDER: &str = "${value}";

/// A field mutation triggered when an issue is dragged into or out of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragOperation {
    pub operation: OperationKind,
    /// Dotted field path, e.g. `labels` or `assignee.accountId`.
    pub field_name: String,
    /// Value to set/add/remove; may contain `${value}`.
    pub value: String,
}

impl DragOperation {
    #[must_use]
    pub fn new(
        operation: OperationKind,
        field_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            field_name: field_name.into(),
            value: value.into(),
        }
    }

    /// The operation's value with every `${value}` replaced by `substitution`.
    #[must_use]
    pub fn substituted_value(&self, substitution: &str) -> String {
        self.value.replace(VALUE_PLACEHOLDER, substitution)
    }
}

/// A single per-field matching rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub id: String,
    /// Dotted field path resolved against the issue's `fields`.
    pub field_name: String,
    #[serde(default)]
    pub filter_type: FilterType,
    /// Pattern for `Regex`, needle for `Includes`, unused for `Unique`.
    #[serde(default, rename = "filterRegExpString")]
    pub pattern: String,
}

impl Filter {
    /// Create a filter with a freshly generated id.
    #[must_use]
    pub fn new(
        field_name: impl Into<String>,
        filter_type: FilterType,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(IdKind::Filter, "", Utc::now()),
            field_name: field_name.into(),
            filter_type,
            pattern: pattern.into(),
        }
    }
}

/// A named bucket within a view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub drag_in: Vec<DragOperation>,
    #[serde(default)]
    pub drag_out: Vec<DragOperation>,
    /// Ordered match filters; lower index means higher priority.
    #[serde(default)]
    pub requirements: Vec<Filter>,
}

impl Section {
    /// Create an empty section with a freshly generated id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: generate_id(IdKind::Section, &name, Utc::now()),
            name,
            drag_in: Vec::new(),
            drag_out: Vec::new(),
            requirements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_requirement_added(&self, filter: Filter) -> Self {
        let mut next = self.clone();
        next.requirements.push(filter);
        next
    }

    /// Replace the requirement with the same id. Unknown ids leave the section unchanged.
    #[must_use]
    pub fn with_requirement_replaced(&self, filter: Filter) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.requirements.iter_mut().find(|f| f.id == filter.id) {
            *slot = filter;
        }
        next
    }

    #[must_use]
    pub fn with_requirement_removed(&self, filter_id: &str) -> Self {
        let mut next = self.clone();
        next.requirements.retain(|f| f.id != filter_id);
        next
    }

    #[must_use]
    pub fn with_drag_in(&self, operations: Vec<DragOperation>) -> Self {
        Self {
            drag_in: operations,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_drag_out(&self, operations: Vec<DragOperation>) -> Self {
        Self {
            drag_out: operations,
            ..self.clone()
        }
    }
}

/// A saved, named configuration partitioning a query's issues into sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub direction: Direction,
    /// JQL query selecting the universe of issues this view works over.
    pub all_issues_jql: String,
    /// Ordered sections; order is the classification tie-break.
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl View {
    /// Create an empty view with a freshly generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, all_issues_jql: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: generate_id(IdKind::View, &name, Utc::now()),
            name,
            icon: String::new(),
            direction: Direction::default(),
            all_issues_jql: all_issues_jql.into(),
            sections: Vec::new(),
        }
    }

    /// Find a section by name, falling back to id.
    #[must_use]
    pub fn section(&self, name_or_id: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.name == name_or_id)
            .or_else(|| self.sections.iter().find(|s| s.id == name_or_id))
    }

    #[must_use]
    pub fn with_section_added(&self, section: Section) -> Self {
        let mut next = self.clone();
        next.sections.push(section);
        next
    }

    /// Replace the section with the same id. Unknown ids leave the view unchanged.
    #[must_use]
    pub fn with_section_replaced(&self, section: Section) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.sections.iter_mut().find(|s| s.id == section.id) {
            *slot = section;
        }
        next
    }

    #[must_use]
    pub fn with_section_removed(&self, section_id: &str) -> Self {
        let mut next = self.clone();
        next.sections.retain(|s| s.id != section_id);
        next
    }

    /// Move the section with `section_id` to position `to` (clamped to the end).
    #[must_use]
    pub fn with_section_moved(&self, section_id: &str, to: usize) -> Self {
        let mut next = self.clone();
        if let Some(from) = next.sections.iter().position(|s| s.id == section_id) {
            let section = next.sections.remove(from);
            let to = to.min(next.sections.len());
            next.sections.insert(to, section);
        }
        next
    }
}

/// Connection details for the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Base URL, e.g. `https://example.atlassian.net`.
    pub host: String,
    pub email: String,
    pub api_token: String,
}

impl Credentials {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.host.trim().is_empty()
            && !self.email.trim().is_empty()
            && !self.api_token.trim().is_empty()
    }
}

/// The persisted preferences aggregate; owns every view.
///
/// Keys this crate does not know about are carried through `extra` so a
/// load/save cycle never drops data written by other parts of the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default)]
    pub selected_view_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserPreferences {
    #[must_use]
    pub fn view(&self, id: &str) -> Option<&View> {
        self.views.iter().find(|v| v.id == id)
    }

    /// The selected view, or the first view when the index is out of range.
    #[must_use]
    pub fn selected_view(&self) -> Option<&View> {
        self.views
            .get(self.selected_view_index)
            .or_else(|| self.views.first())
    }

    #[must_use]
    pub fn with_view_added(&self, view: View) -> Self {
        let mut next = self.clone();
        next.views.push(view);
        next
    }

    /// Replace the view with the same id. Unknown ids leave the preferences unchanged.
    #[must_use]
    pub fn with_view_replaced(&self, view: View) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.views.iter_mut().find(|v| v.id == view.id) {
            *slot = view;
        }
        next
    }

    /// Remove a view, keeping the selection on a valid index.
    #[must_use]
    pub fn with_view_removed(&self, view_id: &str) -> Self {
        let mut next = self.clone();
        next.views.retain(|v| v.id != view_id);
        if next.selected_view_index >= next.views.len() {
            next.selected_view_index = next.views.len().saturating_sub(1);
        }
        next
    }

    #[must_use]
    pub fn with_selected_view(&self, index: usize) -> Self {
        Self {
            selected_view_index: index.min(self.views.len().saturating_sub(1)),
            ..self.clone()
        }
    }
}

/// An issue as returned by the tracker.
///
/// Built-in fields use human keys (`summary`, `status`, `labels`); custom
/// fields appear under opaque keys such as `customfield_10032`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IssueDocument {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default, rename = "self")]
    pub self_url: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl IssueDocument {
    #[must_use]
    pub fn new(id: impl Into<String>, key: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            self_url: String::new(),
            fields,
        }
    }
}

/// A classifier hit: the bucket an issue belongs to and how strongly.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Section name, or the field value itself for `Unique` filters.
    pub section_name: String,
    pub priority: MatchPriority,
}

/// Strength of a match. Ranked matches order by filter index; `Unique`
/// group keys always sort after every ranked match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchPriority {
    Ranked(usize),
    Unique,
}

impl MatchPriority {
    /// Numeric form: the filter index, or `f64::INFINITY` for `Unique`.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Ranked(index) => *index as f64,
            Self::Unique => f64::INFINITY,
        }
    }
}
