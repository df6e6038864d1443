//! Tracing subscriber setup.
//!
//! `JV_LOG` takes an `EnvFilter` directive and wins over the verbosity
//! flags. `JV_LOG_FORMAT=json` switches to JSON lines. Output goes to
//! stderr unless a log file is given.

use anyhow::Context;
use std::env;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, Once};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter directive environment variable.
pub const LOG_ENV: &str = "JV_LOG";
/// Output format environment variable (`compact` or `json`).
pub const LOG_FORMAT_ENV: &str = "JV_LOG_FORMAT";

/// Default directive for a verbosity level.
#[must_use]
pub const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "jira_views=warn,warn",
        1 => "jira_views=info,warn",
        2 => "jira_views=debug,info",
        _ => "trace",
    }
}

fn filter(verbose: u8, quiet: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)))
}

/// Install the global subscriber, taking the format from `JV_LOG_FORMAT`.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let json = env::var(LOG_FORMAT_ENV).is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    init_logging_with_format(verbose, quiet, json, log_file)
}

/// Install the global subscriber with an explicit format.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_logging_with_format(
    verbose: u8,
    quiet: bool,
    json: bool,
    log_file: Option<&Path>,
) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(filter(verbose, quiet));

    match (log_file, json) {
        (Some(path), json) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            let writer = Mutex::new(file);
            if json {
                registry
                    .with(fmt::layer().json().with_ansi(false).with_writer(writer))
                    .try_init()?;
            } else {
                registry
                    .with(fmt::layer().compact().with_ansi(false).with_writer(writer))
                    .try_init()?;
            }
        }
        (None, true) => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .try_init()?;
        }
        (None, false) => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()?;
        }
    }
    Ok(())
}

/// Install a test-writer subscriber once per process.
pub fn init_test_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("debug")))
            .with(fmt::layer().compact().with_test_writer())
            .try_init();
    });
}
