//! Validation helpers for `jira_views`.
//!
//! These routines inspect view definitions and report every problem found
//! as a `ValidationError`. They never mutate the view and never stop at the
//! first problem, so a caller can show the complete list at once.
//!
//! Validation runs over the persisted JSON shape rather than the typed
//! `View`: a view on disk may carry unknown enum strings or wrongly typed
//! members that the typed model cannot represent.

use crate::error::{Result, ValidationError, ViewsError};
use crate::model::{Direction, FilterType, OperationKind, View};
use regex::RegexBuilder;
use serde_json::{Map, Value};

/// Validates view definitions.
pub struct ViewValidator;

impl ViewValidator {
    /// Validate a typed view and return all problems found.
    #[must_use]
    pub fn validate(view: &View) -> Vec<ValidationError> {
        match serde_json::to_value(view) {
            Ok(value) => Self::validate_value(&value),
            Err(err) => vec![ValidationError::new("view", err.to_string())],
        }
    }

    /// Validate a view in its persisted JSON shape.
    #[must_use]
    pub fn validate_value(view: &Value) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let Some(view) = view.as_object() else {
            errors.push(ValidationError::new("view", "must be an object"));
            return errors;
        };

        if !non_empty_str(view, "allIssuesJql") {
            errors.push(ValidationError::new("allIssuesJql", "cannot be empty"));
        }

        match view.get("direction").and_then(Value::as_str) {
            Some(direction) if direction.parse::<Direction>().is_ok() => {}
            _ => errors.push(ValidationError::new(
                "direction",
                format!("must be one of {}", names(&Direction::ALL)),
            )),
        }

        // Icons are not supported yet.
        if view
            .get("icon")
            .and_then(Value::as_str)
            .is_some_and(|icon| !icon.is_empty())
        {
            errors.push(ValidationError::new("icon", "must be empty"));
        }

        if !non_empty_str(view, "id") {
            errors.push(ValidationError::new("id", "cannot be empty"));
        }
        if !non_empty_str(view, "name") {
            errors.push(ValidationError::new("name", "cannot be empty"));
        }

        match view.get("sections") {
            None => {}
            Some(Value::Array(sections)) => {
                for (index, section) in sections.iter().enumerate() {
                    validate_section(&format!("sections[{index}]"), section, &mut errors);
                }
            }
            Some(_) => errors.push(ValidationError::new("sections", "must be an array")),
        }

        errors
    }

    /// Fail with `ViewsError::InvalidView` when the view has any problem.
    ///
    /// # Errors
    ///
    /// Returns `InvalidView` listing every problem found.
    pub fn ensure_valid(view: &View) -> Result<()> {
        let problems = Self::validate(view);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ViewsError::InvalidView {
                view: view.name.clone(),
                problems,
            })
        }
    }
}

fn validate_section(prefix: &str, section: &Value, errors: &mut Vec<ValidationError>) {
    let Some(section) = section.as_object() else {
        errors.push(ValidationError::new(prefix, "must be an object"));
        return;
    };

    if !non_empty_str(section, "id") {
        errors.push(ValidationError::new(format!("{prefix}.id"), "cannot be empty"));
    }
    if !non_empty_str(section, "name") {
        errors.push(ValidationError::new(
            format!("{prefix}.name"),
            "cannot be empty",
        ));
    }

    for key in ["dragIn", "dragOut"] {
        let field = format!("{prefix}.{key}");
        match section.get(key) {
            Some(Value::Array(operations)) => {
                for (index, operation) in operations.iter().enumerate() {
                    validate_drag_operation(&format!("{field}[{index}]"), operation, errors);
                }
            }
            _ => errors.push(ValidationError::new(field, "must be an array")),
        }
    }

    match section.get("requirements") {
        None => {}
        Some(Value::Array(filters)) => {
            for (index, filter) in filters.iter().enumerate() {
                validate_filter(&format!("{prefix}.requirements[{index}]"), filter, errors);
            }
        }
        Some(_) => errors.push(ValidationError::new(
            format!("{prefix}.requirements"),
            "must be an array",
        )),
    }
}

fn validate_drag_operation(prefix: &str, operation: &Value, errors: &mut Vec<ValidationError>) {
    let Some(operation) = operation.as_object() else {
        errors.push(ValidationError::new(prefix, "must be an object"));
        return;
    };

    match operation.get("operation").and_then(Value::as_str) {
        Some(kind) if kind.parse::<OperationKind>().is_ok() => {}
        _ => errors.push(ValidationError::new(
            format!("{prefix}.operation"),
            format!("must be one of {}", names(&OperationKind::ALL)),
        )),
    }
    if !non_empty_str(operation, "fieldName") {
        errors.push(ValidationError::new(
            format!("{prefix}.fieldName"),
            "cannot be empty",
        ));
    }
    if !operation.get("value").is_some_and(Value::is_string) {
        errors.push(ValidationError::new(
            format!("{prefix}.value"),
            "is required",
        ));
    }
}

fn validate_filter(prefix: &str, filter: &Value, errors: &mut Vec<ValidationError>) {
    let Some(filter) = filter.as_object() else {
        errors.push(ValidationError::new(prefix, "must be an object"));
        return;
    };

    if !non_empty_str(filter, "fieldName") {
        errors.push(ValidationError::new(
            format!("{prefix}.fieldName"),
            "cannot be empty",
        ));
    }
    if !non_empty_str(filter, "id") {
        errors.push(ValidationError::new(format!("{prefix}.id"), "cannot be empty"));
    }

    let filter_type = match filter.get("filterType").and_then(Value::as_str) {
        None => {
            errors.push(ValidationError::new(
                format!("{prefix}.filterType"),
                "is required",
            ));
            return;
        }
        Some(raw) => match raw.parse::<FilterType>() {
            Ok(parsed) => parsed,
            Err(_) => {
                errors.push(ValidationError::new(
                    format!("{prefix}.filterType"),
                    format!("must be one of {}", names(&FilterType::ALL)),
                ));
                return;
            }
        },
    };

    match filter_type {
        FilterType::Regex => {
            let field = format!("{prefix}.filterRegExpString");
            match filter.get("filterRegExpString").and_then(Value::as_str) {
                Some(pattern) if !pattern.is_empty() => {
                    if let Err(err) = RegexBuilder::new(pattern).case_insensitive(true).build() {
                        errors.push(ValidationError::new(
                            field,
                            format!("is not a valid regular expression ({err})"),
                        ));
                    }
                }
                _ => errors.push(ValidationError::new(
                    field,
                    "cannot be empty for regex filters",
                )),
            }
        }
        FilterType::Unique | FilterType::Includes => {}
    }
}

fn non_empty_str(object: &Map<String, Value>, key: &str) -> bool {
    object
        .get(key)
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn names<T: std::fmt::Display>(variants: &[T]) -> String {
    variants
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
