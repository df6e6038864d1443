//! Subcommand implementations.

pub mod classify;
pub mod drag;
pub mod migrate;
pub mod validate;

use crate::config::{self, ConfigPaths};
use crate::error::{Result, ViewsError};
use crate::model::{IssueDocument, UserPreferences, View};
use crate::storage::{JsonFilePreferencesStore, SqliteSnapshotStore};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Resolve configuration and open the preferences file.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or resolved.
pub fn open_preferences(
    cli: &config::CliOverrides,
) -> Result<(JsonFilePreferencesStore, ConfigPaths)> {
    let layer = config::load_config(cli)?;
    let paths = config::resolve_paths(&layer)?;
    tracing::debug!(path = %paths.preferences.display(), "Using preferences file");
    Ok((JsonFilePreferencesStore::new(&paths.preferences), paths))
}

/// Open the snapshot database, creating its directory if needed.
///
/// # Errors
///
/// Returns an error if the directory or database cannot be created.
pub fn open_snapshots(paths: &ConfigPaths) -> Result<SqliteSnapshotStore> {
    if let Some(parent) = paths.cache_db.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    SqliteSnapshotStore::open_with_timeout(&paths.cache_db, paths.lock_timeout_ms)
}

/// The view with `id`, or the selected view when no id is given.
///
/// # Errors
///
/// Returns `ViewNotFound` when no such view exists.
pub fn select_view<'p>(preferences: &'p UserPreferences, id: Option<&str>) -> Result<&'p View> {
    match id {
        Some(id) => preferences.view(id).ok_or_else(|| ViewsError::ViewNotFound {
            id: id.to_string(),
        }),
        None => preferences
            .selected_view()
            .ok_or_else(|| ViewsError::ViewNotFound {
                id: "(selected)".to_string(),
            }),
    }
}

/// Read issue documents from a JSON file.
///
/// Accepts a bare array or a search page object with an `issues` member.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not issue JSON.
pub fn read_issues(path: &Path) -> Result<Vec<IssueDocument>> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let issues = match value {
        Value::Object(mut page) if page.contains_key("issues") => {
            page.remove("issues").unwrap_or(Value::Array(Vec::new()))
        }
        other => other,
    };
    Ok(serde_json::from_value(issues)?)
}

/// Read a single issue document from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not an issue object.
pub fn read_issue(path: &Path) -> Result<IssueDocument> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
