//! Shared utilities for `jira_views`.
//!
//! - ID generation (base36 over SHA256)
//! - Loose value coercions used when matching field values

pub mod id;
pub mod coerce;

pub use coerce::{is_truthy, to_display_string};
pub use id::{IdKind, generate_id};
