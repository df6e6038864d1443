use crate::cli::MigrateArgs;
use crate::cli::commands::open_preferences;
use crate::config;
use crate::error::Result;
use crate::migration::{migrate_preferences, parse_preferences};
use crate::storage::PreferencesStore;
use serde::Serialize;

#[derive(Serialize)]
struct MigrateOutput {
    found: bool,
    changed: bool,
    written: bool,
    views: usize,
    unloaded: usize,
}

/// Execute the migrate command.
///
/// # Errors
///
/// Returns an error if the preferences cannot be read, parsed or written.
pub fn execute(args: &MigrateArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (store, _paths) = open_preferences(cli)?;
    let Some(raw) = store.load()? else {
        report(
            &MigrateOutput {
                found: false,
                changed: false,
                written: false,
                views: 0,
                unloaded: 0,
            },
            json,
        )?;
        return Ok(());
    };

    let mut preview = raw.clone();
    let changed = migrate_preferences(&mut preview);
    let parsed = parse_preferences(raw)?;
    for view in &parsed.problems {
        tracing::warn!(
            view = %view.view_id,
            count = view.problems.len(),
            "View has validation problems; run jv validate"
        );
    }

    // Saving typed preferences would drop views that could not be loaded.
    let written = if changed && args.write && parsed.unloaded == 0 {
        store.save(&parsed.preferences)?
    } else {
        if changed && args.write {
            tracing::warn!(
                unloaded = parsed.unloaded,
                "Not writing; fix the views reported by jv validate first"
            );
        }
        false
    };

    report(
        &MigrateOutput {
            found: true,
            changed,
            written,
            views: parsed.preferences.views.len(),
            unloaded: parsed.unloaded,
        },
        json,
    )
}

fn report(output: &MigrateOutput, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(output)?);
        return Ok(());
    }
    match (output.found, output.changed, output.written) {
        (false, _, _) => println!("No preferences found; nothing to migrate"),
        (true, false, _) => println!("Preferences are current ({} views)", output.views),
        (true, true, true) => println!("Migrated and saved {} views", output.views),
        (true, true, false) if output.unloaded > 0 => println!(
            "Migration needed but not saved: {} stored view(s) could not be loaded; run jv validate",
            output.unloaded
        ),
        (true, true, false) => println!(
            "Migration needed for {} views; re-run with --write to save",
            output.views
        ),
    }
    Ok(())
}
