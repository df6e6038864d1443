//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Inspect, classify and drag issues through saved board views
#[derive(Parser, Debug)]
#[command(name = "jv", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Preferences file (default: ~/.config/jira-views/preferences.json)
    #[arg(long, global = true)]
    pub preferences: Option<PathBuf>,

    /// Issue snapshot database (default: ~/.config/jira-views/cache.db)
    #[arg(long, global = true)]
    pub cache_db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate saved views and list every problem
    Validate(ValidateArgs),

    /// Upgrade saved views to the current schema
    Migrate(MigrateArgs),

    /// Bucket issues into a view's sections
    #[command(after_help = "EXAMPLES:
  jv classify --view view-abc --issues issues.json
  jv classify --view view-abc --issues issues.json --save
  jv classify --view view-abc              Use the stored snapshot")]
    Classify(ClassifyArgs),

    /// Compute the field update for moving an issue between sections
    #[command(after_help = "EXAMPLES:
  jv drag --view view-abc --issue ABC-1.json --to Done
  jv drag --view view-abc --issue ABC-1.json --from 'To Do' --to Done --json")]
    Drag(DragArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Only validate this view (id)
    #[arg(long)]
    pub view: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct MigrateArgs {
    /// Write the migrated preferences back
    #[arg(long)]
    pub write: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ClassifyArgs {
    /// View id (default: the selected view)
    #[arg(long)]
    pub view: Option<String>,

    /// JSON file with an array of issues or a search page
    #[arg(long)]
    pub issues: Option<PathBuf>,

    /// Store the issues as the view's snapshot
    #[arg(long, requires = "issues")]
    pub save: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct DragArgs {
    /// View id (default: the selected view)
    #[arg(long)]
    pub view: Option<String>,

    /// JSON file with the current state of the issue
    #[arg(long)]
    pub issue: PathBuf,

    /// Destination section (name or id)
    #[arg(long)]
    pub to: String,

    /// Source section (name or id)
    #[arg(long)]
    pub from: Option<String>,

    /// Destination bucket name when it differs from the section (unique buckets)
    #[arg(long)]
    pub to_bucket: Option<String>,

    /// Source bucket name when it differs from the section (unique buckets)
    #[arg(long)]
    pub from_bucket: Option<String>,
}
