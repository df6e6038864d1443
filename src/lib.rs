//! View, filter and drag-mutation engine for a Jira board client.
//!
//! A view partitions the issues returned by its query into sections using
//! per-field filters. Moving an issue between sections runs the sections'
//! drag operations against fresh issue state and yields a minimal field
//! update. Issue lists are cached per view and refreshed in the background.

pub mod cache;
pub mod classify;
pub mod cli;
pub mod config;
pub mod drag;
pub mod error;
pub mod logging;
pub mod migration;
pub mod model;
pub mod path;
pub mod storage;
pub mod tracker;
pub mod util;
pub mod validation;

pub use error::{Result, ViewsError};
