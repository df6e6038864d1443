use clap::Parser;
use jira_views::ViewsError;
use jira_views::cli::commands;
use jira_views::cli::{Cli, Commands};
use jira_views::config;
use jira_views::logging::init_logging_with_format;
use std::io::{self, IsTerminal};

fn main() {
    let cli = Cli::parse();
    let overrides = build_cli_overrides(&cli);

    let json_logs = config::load_config(&overrides)
        .map(|layer| config::json_logs_from_layer(&layer))
        .unwrap_or(false);
    if let Err(e) = init_logging_with_format(cli.verbose, cli.quiet, json_logs, None) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let result = match &cli.command {
        Commands::Validate(args) => commands::validate::execute(args, cli.json, &overrides),
        Commands::Migrate(args) => commands::migrate::execute(args, cli.json, &overrides),
        Commands::Classify(args) => commands::classify::execute(args, cli.json, &overrides),
        Commands::Drag(args) => commands::drag::execute(args, cli.json, &overrides),
    };

    if let Err(e) = result {
        handle_error(&e, cli.json);
    }
}

/// Print the error and exit.
///
/// When --json is set or stdout is not a TTY, outputs a JSON object to stderr.
fn handle_error(err: &ViewsError, json_mode: bool) -> ! {
    let exit_code = err.exit_code();
    let use_json = json_mode || !io::stdout().is_terminal();

    if use_json {
        let payload = serde_json::json!({
            "error": err.to_string(),
            "recoverable": err.is_user_recoverable(),
            "suggestion": err.suggestion(),
            "exitCode": exit_code,
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
        );
    } else {
        eprintln!("Error: {err}");
        if let Some(suggestion) = err.suggestion() {
            eprintln!("Hint: {suggestion}");
        }
    }

    std::process::exit(exit_code);
}

fn build_cli_overrides(cli: &Cli) -> config::CliOverrides {
    config::CliOverrides {
        preferences: cli.preferences.clone(),
        cache_db: cli.cache_db.clone(),
        json_logs: None,
    }
}
