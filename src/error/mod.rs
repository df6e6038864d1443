//! Error types and handling for `jira_views`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Validation problems are collected as `ValidationError` values and only
//!   become a `ViewsError` at a boundary that must refuse the input
//! - Remote failures are wrapped in the cloneable `FetchError` so one failure
//!   can be handed to every waiter of a coalesced fetch
//! - Provides recovery hints for user-facing errors

use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `jira_views` operations.
#[derive(Error, Debug)]
pub enum ViewsError {
    // === View Errors ===
    /// No view with the given id exists in the user's preferences.
    #[error("View not found: {id}")]
    ViewNotFound { id: String },

    /// The view has no section with the given name or id.
    #[error("Section not found in view '{view}': {section}")]
    SectionNotFound { view: String, section: String },

    /// A query was requested for a view without an `allIssuesJql` clause.
    #[error("View '{view}' has no issue query (allIssuesJql is empty)")]
    MissingJql { view: String },

    /// The view failed validation; problems are listed one per line.
    #[error("Invalid view '{view}':\n{}", format_problems(.problems))]
    InvalidView {
        view: String,
        problems: Vec<ValidationError>,
    },

    // === Remote Errors ===
    /// A remote fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The tracker rejected a field update.
    #[error("Update rejected for {key}: {reason}")]
    Update { key: String, reason: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === Storage Errors ===
    /// `SQLite` snapshot store error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Preferences file could not be written.
    #[error("Failed to write preferences to '{path}': {reason}")]
    PreferencesWrite { path: PathBuf, reason: String },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error from collaborator code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A remote fetch failure.
///
/// Cloneable so that a single failed request can be reported to every caller
/// that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Fetch failed for '{target}': {message}")]
pub struct FetchError {
    /// The query, issue key or cache key the fetch was for.
    pub target: String,
    /// Human-readable cause.
    pub message: String,
}

impl FetchError {
    #[must_use]
    pub fn new(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            message: message.into(),
        }
    }
}

/// A single view validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Location of the problem, e.g. `sections[1].requirements[0].fieldName`.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Join validation problems as newline-separated text for display.
#[must_use]
pub fn format_problems(problems: &[ValidationError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl ViewsError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ViewNotFound { .. }
                | Self::SectionNotFound { .. }
                | Self::MissingJql { .. }
                | Self::InvalidView { .. }
                | Self::Config(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::ViewNotFound { .. } => Some("Run: jv validate to list the configured views"),
            Self::SectionNotFound { .. } => Some("Section names are case-sensitive"),
            Self::MissingJql { .. } => Some("Give the view a JQL query, e.g. project = ABC"),
            Self::InvalidView { .. } => Some("Fix the listed problems and save the view again"),
            Self::Fetch(_) => Some("Check the tracker connection and try again"),
            _ => None,
        }
    }

    /// Get the exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidView { .. } => 2,
            Self::Fetch(_) | Self::Update { .. } => 3,
            _ => 1,
        }
    }
}

/// Result type using `ViewsError`.
pub type Result<T> = std::result::Result<T, ViewsError>;
