//! Schema migration for persisted preferences.
//!
//! Older clients wrote views without `dragIn`/`dragOut` on sections and
//! without `filterType` on filters, and stored the selection as a view id
//! instead of an index. Migration runs over the raw JSON blob on every load,
//! before it is deserialized into typed preferences, so that absent members
//! can be told apart from explicit ones.
//!
//! Every step is idempotent: a second run reports no change.

use crate::error::{Result, ValidationError};
use crate::model::{FilterType, UserPreferences, View};
use crate::storage::PreferencesStore;
use crate::validation::ViewValidator;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

/// Legacy key holding the selected view id.
pub const LEGACY_SELECTED_VIEW_KEY: &str = "selectedViewId";
/// Current key holding the selected view index.
pub const SELECTED_VIEW_INDEX_KEY: &str = "selectedViewIndex";

/// Bring every view in `views` up to the current shape.
///
/// Returns `true` when anything was defaulted.
pub fn migrate_views(views: &mut [Value]) -> bool {
    let mut changed = false;
    for view in views.iter_mut() {
        let Some(sections) = view.get_mut("sections").and_then(Value::as_array_mut) else {
            continue;
        };
        for section in sections.iter_mut().filter_map(Value::as_object_mut) {
            changed |= migrate_section(section);
        }
    }
    changed
}

fn migrate_section(section: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    for key in ["dragIn", "dragOut"] {
        if !section.contains_key(key) {
            debug!(section = ?section.get("name"), key, "Defaulting drag operations");
            section.insert(key.to_string(), Value::Array(Vec::new()));
            changed = true;
        }
    }

    if let Some(filters) = section.get_mut("requirements").and_then(Value::as_array_mut) {
        for filter in filters.iter_mut().filter_map(Value::as_object_mut) {
            if !filter.contains_key("filterType") {
                filter.insert(
                    "filterType".to_string(),
                    Value::String(FilterType::Regex.as_str().to_string()),
                );
                changed = true;
            }
        }
    }
    changed
}

/// Replace the legacy selected-view id with a selected-view index.
///
/// The index defaults to 0. Returns `true` when the legacy key was present.
pub fn migrate_selected_view(preferences: &mut Map<String, Value>) -> bool {
    if preferences.remove(LEGACY_SELECTED_VIEW_KEY).is_none() {
        return false;
    }
    info!("Replacing legacy selected view id with selected view index");
    preferences.insert(SELECTED_VIEW_INDEX_KEY.to_string(), Value::from(0));
    true
}

/// Run every migration over a raw preferences blob.
///
/// Returns `true` when the blob was changed and should be re-persisted.
pub fn migrate_preferences(preferences: &mut Value) -> bool {
    let Some(object) = preferences.as_object_mut() else {
        return false;
    };
    let mut changed = migrate_selected_view(object);
    if let Some(views) = object.get_mut("views").and_then(Value::as_array_mut) {
        changed |= migrate_views(views);
    }
    changed
}

/// Problems found in one view while loading preferences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewProblems {
    pub view_id: String,
    pub view_name: String,
    pub problems: Vec<ValidationError>,
}

/// A raw preferences blob after migration and typing.
#[derive(Debug, Clone)]
pub struct ParsedPreferences {
    /// Preferences holding every view that could be typed.
    pub preferences: UserPreferences,
    /// Whether migration changed the stored shape.
    pub migrated: bool,
    /// Validation problems, one entry per invalid view.
    pub problems: Vec<ViewProblems>,
    /// Stored views left out of `preferences` because they do not fit the
    /// typed model. Saving `preferences` would delete them.
    pub unloaded: usize,
}

/// Result of loading preferences through the migration pipeline.
#[derive(Debug, Clone)]
pub struct LoadedPreferences {
    pub preferences: UserPreferences,
    /// Whether migration changed the stored shape.
    pub migrated: bool,
    /// Whether the migrated shape was written back to the store.
    pub persisted: bool,
    /// Validation problems, one entry per invalid view.
    pub problems: Vec<ViewProblems>,
    /// Stored views that could not be loaded; see `ParsedPreferences`.
    pub unloaded: usize,
}

/// Migrate and type a raw preferences blob without touching storage.
///
/// Views are typed one at a time. A view the typed model cannot hold
/// (an unknown direction or operation, a missing field name) is reported
/// in `problems` and left out; the remaining views still load.
///
/// # Errors
///
/// Returns an error if the blob outside the views does not deserialize.
pub fn parse_preferences(mut raw: Value) -> Result<ParsedPreferences> {
    let migrated = migrate_preferences(&mut raw);

    let stored_views = match raw.as_object_mut().and_then(|object| object.remove("views")) {
        Some(Value::Array(views)) => views,
        Some(other) => {
            raw["views"] = other;
            Vec::new()
        }
        None => Vec::new(),
    };

    let mut views = Vec::with_capacity(stored_views.len());
    let mut problems = Vec::new();
    let mut unloaded = 0;
    for view in stored_views {
        let mut found = ViewValidator::validate_value(&view);
        let view_id = string_member(&view, "id");
        let view_name = string_member(&view, "name");
        match serde_json::from_value::<View>(view) {
            Ok(typed) => views.push(typed),
            Err(err) => {
                unloaded += 1;
                warn!(view = %view_id, error = %err, "Stored view could not be loaded");
                if found.is_empty() {
                    found.push(ValidationError::new(
                        "view",
                        format!("could not be loaded ({err})"),
                    ));
                }
            }
        }
        if !found.is_empty() {
            warn!(view = %view_id, count = found.len(), "Stored view failed validation");
            problems.push(ViewProblems {
                view_id,
                view_name,
                problems: found,
            });
        }
    }

    let mut preferences: UserPreferences = serde_json::from_value(raw)?;
    preferences.views = views;
    Ok(ParsedPreferences {
        preferences,
        migrated,
        problems,
        unloaded,
    })
}

/// Load preferences from `store`, migrating and validating them.
///
/// A missing blob yields default preferences. When migration changed
/// anything the result is saved back so the next load is a no-op, unless
/// some stored view could not be loaded: saving would drop it.
///
/// # Errors
///
/// Returns an error if the store fails or the blob is not valid preferences.
pub fn load_preferences(store: &impl PreferencesStore) -> Result<LoadedPreferences> {
    let Some(raw) = store.load()? else {
        debug!("No stored preferences; using defaults");
        return Ok(LoadedPreferences {
            preferences: UserPreferences::default(),
            migrated: false,
            persisted: false,
            problems: Vec::new(),
            unloaded: 0,
        });
    };

    let parsed = parse_preferences(raw)?;
    let persisted = if !parsed.migrated {
        false
    } else if parsed.unloaded > 0 {
        warn!(
            unloaded = parsed.unloaded,
            "Not persisting migrated preferences; some stored views could not be loaded"
        );
        false
    } else {
        let saved = store.save(&parsed.preferences)?;
        if !saved {
            warn!("Migrated preferences could not be persisted");
        }
        saved
    };

    Ok(LoadedPreferences {
        preferences: parsed.preferences,
        migrated: parsed.migrated,
        persisted,
        problems: parsed.problems,
        unloaded: parsed.unloaded,
    })
}

fn string_member(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
