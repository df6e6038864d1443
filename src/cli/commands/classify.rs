use crate::classify::{BucketKind, ViewClassifier, primary_match};
use crate::cli::ClassifyArgs;
use crate::cli::commands::{open_preferences, open_snapshots, read_issues, select_view};
use crate::config;
use crate::error::{FetchError, Result};
use crate::migration::load_preferences;
use crate::model::IssueDocument;
use crate::storage::SnapshotStore;
use crate::validation::ViewValidator;
use serde::Serialize;

#[derive(Serialize)]
struct BucketOutput {
    name: String,
    kind: &'static str,
    count: usize,
    issues: Vec<String>,
}

#[derive(Serialize)]
struct PrimaryOutput {
    issue: String,
    section: Option<String>,
}

#[derive(Serialize)]
struct ClassifyOutput {
    view: String,
    total: usize,
    buckets: Vec<BucketOutput>,
    primary: Vec<PrimaryOutput>,
}

/// Execute the classify command.
///
/// # Errors
///
/// Returns an error if the view is missing or invalid, or the issues
/// cannot be read from the file or the snapshot store.
pub fn execute(args: &ClassifyArgs, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (store, paths) = open_preferences(cli)?;
    let loaded = load_preferences(&store)?;
    let view = select_view(&loaded.preferences, args.view.as_deref())?;
    ViewValidator::ensure_valid(view)?;

    let issues: Vec<IssueDocument> = match &args.issues {
        Some(path) => {
            let issues = read_issues(path)?;
            if args.save {
                open_snapshots(&paths)?.put(&view.id, &issues)?;
                tracing::info!(view = %view.id, count = issues.len(), "Saved issue snapshot");
            }
            issues
        }
        None => {
            let snapshot = open_snapshots(&paths)?.get(&view.id)?.ok_or_else(|| {
                FetchError::new(&view.id, "no stored snapshot; pass --issues FILE")
            })?;
            tracing::debug!(
                view = %view.id,
                fetched_at = %snapshot.fetched_at,
                "Using stored snapshot"
            );
            snapshot.issues
        }
    };

    let classifier = ViewClassifier::new(view);
    let buckets = classifier.bucket(&issues);
    let primary: Vec<PrimaryOutput> = issues
        .iter()
        .map(|issue| {
            let results = classifier.classify_issue(issue);
            PrimaryOutput {
                issue: issue.key.clone(),
                section: primary_match(&results).map(|m| m.section_name.clone()),
            }
        })
        .collect();

    if json {
        let output = ClassifyOutput {
            view: view.id.clone(),
            total: issues.len(),
            buckets: buckets
                .iter()
                .map(|bucket| BucketOutput {
                    name: bucket.name.clone(),
                    kind: kind_label(bucket.kind),
                    count: bucket.len(),
                    issues: bucket.issues.iter().map(|i| i.key.clone()).collect(),
                })
                .collect(),
            primary,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} ({} issues)", view.name, issues.len());
    for bucket in &buckets {
        println!();
        println!("{} [{}]", bucket.name, bucket.len());
        for issue in &bucket.issues {
            let summary = issue
                .fields
                .get("summary")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            println!("  {:<12} {summary}", issue.key);
        }
    }
    Ok(())
}

const fn kind_label(kind: BucketKind) -> &'static str {
    match kind {
        BucketKind::Section => "section",
        BucketKind::Unique => "unique",
        BucketKind::Uncategorized => "uncategorized",
    }
}
