//! Section classification.
//!
//! Decides which section(s) of a view an issue belongs to. Each filter in a
//! section's requirements is tried in order; every filter that matches
//! contributes one `MatchResult`, so an issue can land in several sections
//! (and in one section more than once).
//!
//! Filter strategies:
//! - `Unique`: the field value itself becomes the bucket name
//! - `Regex`: case-insensitive match against the value's display string
//! - `Includes`: array membership, or substring of the display string
//!
//! Field values that are absent, `null`, `false`, `0` or `""` never match.

use crate::model::{FilterType, IssueDocument, MatchPriority, MatchResult, Section, View};
use crate::path::resolve;
use crate::util::{is_truthy, to_display_string};
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{trace, warn};

/// Bucket name for issues no section claims.
pub const NOT_CATEGORIZED: &str = "Not categorized";

/// A filter with its pattern compiled once.
#[derive(Debug)]
enum CompiledFilter<'a> {
    Unique { field: &'a str },
    /// `regex` is `None` when the pattern failed to compile; such a filter never matches.
    Regex { field: &'a str, regex: Option<Regex> },
    Includes { field: &'a str, needle: &'a str },
}

impl<'a> CompiledFilter<'a> {
    fn field(&self) -> &'a str {
        match self {
            Self::Unique { field } | Self::Regex { field, .. } | Self::Includes { field, .. } => {
                *field
            }
        }
    }
}

/// Matches issues against one section, with regexes compiled up front.
#[derive(Debug)]
pub struct SectionMatcher<'a> {
    section: &'a Section,
    filters: Vec<CompiledFilter<'a>>,
}

impl<'a> SectionMatcher<'a> {
    #[must_use]
    pub fn new(section: &'a Section) -> Self {
        let filters = section
            .requirements
            .iter()
            .map(|filter| match filter.filter_type {
                FilterType::Unique => CompiledFilter::Unique {
                    field: &filter.field_name,
                },
                FilterType::Regex => {
                    let regex = RegexBuilder::new(&filter.pattern)
                        .case_insensitive(true)
                        .build()
                        .map_err(|err| {
                            warn!(
                                section = %section.name,
                                filter = %filter.id,
                                error = %err,
                                "Ignoring filter with invalid regular expression"
                            );
                        })
                        .ok();
                    CompiledFilter::Regex {
                        field: &filter.field_name,
                        regex,
                    }
                }
                FilterType::Includes => CompiledFilter::Includes {
                    field: &filter.field_name,
                    needle: &filter.pattern,
                },
            })
            .collect();
        Self { section, filters }
    }

    #[must_use]
    pub const fn section(&self) -> &'a Section {
        self.section
    }

    /// Every match this section produces for `issue`, in filter order.
    #[must_use]
    pub fn matches(&self, issue: &IssueDocument) -> Vec<MatchResult> {
        let mut results = Vec::new();
        for (index, filter) in self.filters.iter().enumerate() {
            let value = resolve(issue, filter.field());
            if !is_truthy(value) {
                continue;
            }
            let Some(value) = value else {
                continue;
            };

            let result = match filter {
                CompiledFilter::Unique { .. } => Some(MatchResult {
                    section_name: to_display_string(value),
                    priority: MatchPriority::Unique,
                }),
                CompiledFilter::Regex { regex, .. } => regex
                    .as_ref()
                    .filter(|re| re.is_match(&to_display_string(value)))
                    .map(|_| self.ranked(index)),
                CompiledFilter::Includes { needle, .. } => {
                    includes(value, needle).then(|| self.ranked(index))
                }
            };

            if let Some(result) = result {
                trace!(
                    issue = %issue.key,
                    section = %self.section.name,
                    bucket = %result.section_name,
                    filter_index = index,
                    "Filter matched"
                );
                results.push(result);
            }
        }
        results
    }

    fn ranked(&self, index: usize) -> MatchResult {
        MatchResult {
            section_name: self.section.name.clone(),
            priority: MatchPriority::Ranked(index),
        }
    }
}

fn includes(value: &Value, needle: &str) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| item.as_str() == Some(needle)),
        other => to_display_string(other).contains(needle),
    }
}

/// Classify one issue against one section.
#[must_use]
pub fn classify(issue: &IssueDocument, section: &Section) -> Vec<MatchResult> {
    SectionMatcher::new(section).matches(issue)
}

/// The strongest match: lowest filter index, ranked matches before `Unique`.
/// Ties keep the earliest result.
#[must_use]
pub fn primary_match(results: &[MatchResult]) -> Option<&MatchResult> {
    results.iter().min_by_key(|result| result.priority)
}

/// Where a bucket came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    /// A configured section.
    Section,
    /// A group key produced by a `Unique` filter.
    Unique,
    /// Issues no section matched.
    Uncategorized,
}

/// A rendered column/row: a name and the issues in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket<'i> {
    pub name: String,
    pub kind: BucketKind,
    pub issues: Vec<&'i IssueDocument>,
}

impl<'i> Bucket<'i> {
    fn new(name: impl Into<String>, kind: BucketKind) -> Self {
        Self {
            name: name.into(),
            kind,
            issues: Vec::new(),
        }
    }

    fn push_once(&mut self, issue: &'i IssueDocument) {
        if !self
            .issues
            .last()
            .is_some_and(|last| std::ptr::eq(*last, issue))
        {
            self.issues.push(issue);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Classifies issues against every section of a view.
#[derive(Debug)]
pub struct ViewClassifier<'a> {
    matchers: Vec<SectionMatcher<'a>>,
}

impl<'a> ViewClassifier<'a> {
    #[must_use]
    pub fn new(view: &'a View) -> Self {
        Self {
            matchers: view.sections.iter().map(SectionMatcher::new).collect(),
        }
    }

    /// All matches for `issue`, in section order then filter order.
    #[must_use]
    pub fn classify_issue(&self, issue: &IssueDocument) -> Vec<MatchResult> {
        self.matchers
            .iter()
            .flat_map(|matcher| matcher.matches(issue))
            .collect()
    }

    /// Group issues into buckets.
    ///
    /// Section buckets come first in section order (sections made only of
    /// `Unique` filters get no bucket of their own), then `Unique` group
    /// buckets in order of first appearance, then "Not categorized" when any
    /// issue matched nothing. An issue appears at most once per bucket but
    /// may appear in many buckets.
    #[must_use]
    pub fn bucket<'i>(&self, issues: &'i [IssueDocument]) -> Vec<Bucket<'i>> {
        let mut buckets: Vec<Bucket<'i>> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for matcher in &self.matchers {
            let section = matcher.section();
            let has_ranked = section.requirements.is_empty()
                || section
                    .requirements
                    .iter()
                    .any(|f| f.filter_type != FilterType::Unique);
            if has_ranked && !by_name.contains_key(&section.name) {
                by_name.insert(section.name.clone(), buckets.len());
                buckets.push(Bucket::new(section.name.clone(), BucketKind::Section));
            }
        }

        let mut uncategorized = Bucket::new(NOT_CATEGORIZED, BucketKind::Uncategorized);
        for issue in issues {
            let results = self.classify_issue(issue);
            if results.is_empty() {
                uncategorized.push_once(issue);
                continue;
            }
            for result in results {
                let index = *by_name.entry(result.section_name.clone()).or_insert_with(|| {
                    buckets.push(Bucket::new(result.section_name.clone(), BucketKind::Unique));
                    buckets.len() - 1
                });
                buckets[index].push_once(issue);
            }
        }

        if !uncategorized.is_empty() {
            buckets.push(uncategorized);
        }
        buckets
    }
}

/// Group `issues` into the buckets of `view`.
#[must_use]
pub fn classify_view<'i>(view: &View, issues: &'i [IssueDocument]) -> Vec<Bucket<'i>> {
    ViewClassifier::new(view).bucket(issues)
}
