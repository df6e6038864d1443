//! Property-based tests for preference migration.
//!
//! Uses proptest to verify that:
//! - Migration is idempotent for any mix of legacy and current sections
//! - Explicitly present members are never overwritten
//! - Migrated blobs always deserialize into typed preferences

mod common;

use common::init_test_logging;
use jira_views::migration::{migrate_preferences, parse_preferences};
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use tracing::info;

fn filter_json() -> impl Strategy<Value = Value> {
    (
        "[a-z]{1,8}",
        prop::option::of(prop_oneof![
            Just("regex"),
            Just("includes"),
            Just("unique")
        ]),
    )
        .prop_map(|(field, filter_type)| {
            let mut filter = Map::new();
            filter.insert("id".into(), json!(format!("filter-{field}")));
            filter.insert("fieldName".into(), json!(field));
            filter.insert("filterRegExpString".into(), json!("x"));
            if let Some(kind) = filter_type {
                filter.insert("filterType".into(), json!(kind));
            }
            Value::Object(filter)
        })
}

fn section_json() -> impl Strategy<Value = Value> {
    (
        "[A-Z][a-z]{0,6}",
        any::<bool>(),
        any::<bool>(),
        prop::collection::vec(filter_json(), 0..4),
    )
        .prop_map(|(name, has_in, has_out, requirements)| {
            let mut section = Map::new();
            section.insert("id".into(), json!(format!("section-{name}")));
            section.insert("name".into(), json!(name));
            section.insert("requirements".into(), Value::Array(requirements));
            if has_in {
                section.insert(
                    "dragIn".into(),
                    json!([{"operation": "add", "fieldName": "labels", "value": "${value}"}]),
                );
            }
            if has_out {
                section.insert("dragOut".into(), json!([]));
            }
            Value::Object(section)
        })
}

fn preferences_json() -> impl Strategy<Value = Value> {
    (prop::collection::vec(section_json(), 0..5), any::<bool>()).prop_map(
        |(sections, legacy_selection)| {
            let mut preferences = json!({
                "views": [{
                    "id": "view-1",
                    "name": "Board",
                    "icon": "",
                    "direction": "vertical",
                    "allIssuesJql": "project = ABC",
                    "sections": sections,
                }]
            });
            if legacy_selection {
                preferences["selectedViewId"] = json!("view-1");
            }
            preferences
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        ..Default::default()
    })]

    #[test]
    fn migration_is_idempotent(raw in preferences_json()) {
        init_test_logging();
        let mut once = raw.clone();
        let changed = migrate_preferences(&mut once);
        info!("proptest_migration_is_idempotent: changed={changed}");

        let mut twice = once.clone();
        prop_assert!(!migrate_preferences(&mut twice));
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(changed, once != raw);
    }

    #[test]
    fn present_members_are_preserved(raw in preferences_json()) {
        init_test_logging();
        let mut migrated = raw.clone();
        migrate_preferences(&mut migrated);

        let before = raw["views"][0]["sections"].as_array().cloned().unwrap_or_default();
        let after = migrated["views"][0]["sections"].as_array().cloned().unwrap_or_default();
        prop_assert_eq!(before.len(), after.len());
        for (old, new) in before.iter().zip(&after) {
            for key in ["dragIn", "dragOut"] {
                match old.get(key) {
                    Some(value) => prop_assert_eq!(Some(value), new.get(key)),
                    None => prop_assert_eq!(new.get(key), Some(&json!([]))),
                }
            }
            let old_filters = old["requirements"].as_array().cloned().unwrap_or_default();
            for (index, filter) in old_filters.iter().enumerate() {
                let expected = filter.get("filterType").cloned().unwrap_or_else(|| json!("regex"));
                prop_assert_eq!(&new["requirements"][index]["filterType"], &expected);
            }
        }
    }

    #[test]
    fn migrated_blobs_deserialize(raw in preferences_json()) {
        init_test_logging();
        let legacy = raw.get("selectedViewId").is_some();
        let parsed = parse_preferences(raw).expect("typed preferences");
        prop_assert!(parsed.problems.is_empty());
        prop_assert_eq!(parsed.unloaded, 0);
        prop_assert_eq!(parsed.preferences.selected_view_index, 0);
        prop_assert_eq!(parsed.preferences.views.len(), 1);
        if legacy {
            prop_assert!(parsed.migrated);
        }
    }
}
