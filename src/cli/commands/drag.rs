use crate::cli::DragArgs;
use crate::cli::commands::{open_preferences, read_issue, select_view};
use crate::config;
use crate::drag::{DropTarget, FieldPatch, compute_drop, find_section};
use crate::error::Result;
use crate::migration::load_preferences;
use crate::validation::ViewValidator;
use serde::Serialize;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DragOutput<'a> {
    id: &'a str,
    key: &'a str,
    changed: bool,
    update: serde_json::Value,
}

/// Execute the drag command.
///
/// The issue file stands in for the tracker's current state of the issue;
/// the computed update is printed, not submitted.
///
/// # Errors
///
/// Returns an error if the view or a section is missing, the view is
/// invalid, or the issue file cannot be read.
pub fn execute(args: &DragArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (store, _paths) = open_preferences(cli)?;
    let loaded = load_preferences(&store)?;
    let view = select_view(&loaded.preferences, args.view.as_deref())?;
    ViewValidator::ensure_valid(view)?;

    let to = DropTarget::bucket(&args.to, args.to_bucket.as_deref().unwrap_or(&args.to));
    let from = args.from.as_deref().map(|section| {
        DropTarget::bucket(section, args.from_bucket.as_deref().unwrap_or(section))
    });
    let to_section = find_section(view, to.section)?;
    let from_section = from.map(|target| find_section(view, target.section)).transpose()?;

    let issue = read_issue(&args.issue)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let patch = runtime.block_on(compute_drop(
        &issue,
        from_section,
        to_section,
        from.map_or("", |target| target.bucket),
        to.bucket,
        || async { Ok(issue.clone()) },
    ))?;

    print_patch(&patch, json)
}

fn print_patch(patch: &FieldPatch, json: bool) -> Result<()> {
    if json {
        let output = DragOutput {
            id: &patch.id,
            key: &patch.key,
            changed: !patch.is_empty(),
            update: patch.update_body(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if patch.is_empty() {
        println!("{}: no changes needed", patch.key);
        return Ok(());
    }
    println!("{}: update {} field(s)", patch.key, patch.fields.len());
    for (field, value) in &patch.fields {
        println!("  {field} = {}", serde_json::to_string(value)?);
    }
    Ok(())
}
