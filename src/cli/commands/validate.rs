use crate::cli::ValidateArgs;
use crate::cli::commands::open_preferences;
use crate::config;
use crate::error::{Result, ValidationError, ViewsError};
use crate::migration::{ViewProblems, migrate_preferences};
use crate::storage::PreferencesStore;
use crate::validation::ViewValidator;
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct ProblemOutput {
    field: String,
    message: String,
}

#[derive(Serialize)]
struct ViewReport {
    id: String,
    name: String,
    valid: bool,
    problems: Vec<ProblemOutput>,
}

#[derive(Serialize)]
struct ValidateOutput {
    checked: usize,
    invalid: usize,
    views: Vec<ViewReport>,
}

/// Execute the validate command.
///
/// Preferences are migrated in memory first so legacy files are judged by
/// the current schema; nothing is written.
///
/// # Errors
///
/// Returns `InvalidView` listing every problem when any checked view is
/// invalid, or an error if the preferences cannot be read.
pub fn execute(args: &ValidateArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (store, _paths) = open_preferences(cli)?;
    let Some(mut raw) = store.load()? else {
        if json {
            let empty = ValidateOutput {
                checked: 0,
                invalid: 0,
                views: Vec::new(),
            };
            println!("{}", serde_json::to_string(&empty)?);
        } else {
            println!("No preferences found at {}", store.path().display());
        }
        return Ok(());
    };

    // Report every stored view, including ones the typed model cannot hold.
    migrate_preferences(&mut raw);
    let mut checked: Vec<ViewProblems> = raw
        .get("views")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|view| ViewProblems {
            view_id: string_member(view, "id"),
            view_name: string_member(view, "name"),
            problems: ViewValidator::validate_value(view),
        })
        .collect();
    if let Some(id) = args.view.as_deref() {
        checked.retain(|view| view.view_id == id);
        if checked.is_empty() {
            return Err(ViewsError::ViewNotFound { id: id.to_string() });
        }
    }

    let reports: Vec<ViewReport> = checked
        .iter()
        .map(|view| ViewReport {
            id: view.view_id.clone(),
            name: view.view_name.clone(),
            valid: view.problems.is_empty(),
            problems: view
                .problems
                .iter()
                .map(|p| ProblemOutput {
                    field: p.field.clone(),
                    message: p.message.clone(),
                })
                .collect(),
        })
        .collect();
    let invalid: Vec<&ViewProblems> = checked
        .iter()
        .filter(|view| !view.problems.is_empty())
        .collect();

    if json {
        let output = ValidateOutput {
            checked: reports.len(),
            invalid: invalid.len(),
            views: reports,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for report in &reports {
            let marker = if report.valid { "ok" } else { "INVALID" };
            println!("{marker:>7}  {} ({})", report.name, report.id);
            for problem in &report.problems {
                println!("         {}: {}", problem.field, problem.message);
            }
        }
    }

    if invalid.is_empty() {
        return Ok(());
    }
    Err(combined_error(&invalid))
}

fn string_member(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn combined_error(invalid: &[&ViewProblems]) -> ViewsError {
    if let [single] = invalid {
        return ViewsError::InvalidView {
            view: single.view_name.clone(),
            problems: single.problems.clone(),
        };
    }
    let names = invalid
        .iter()
        .map(|p| p.view_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let problems = invalid
        .iter()
        .flat_map(|p| {
            p.problems.iter().map(|problem| {
                ValidationError::new(
                    format!("{}.{}", p.view_id, problem.field),
                    problem.message.clone(),
                )
            })
        })
        .collect();
    ViewsError::InvalidView {
        view: names,
        problems,
    }
}
