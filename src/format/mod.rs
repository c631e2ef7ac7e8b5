//! Output formatting for `git_issue`.
//!
//! Supports both human-readable text output and machine-parseable JSON.
//!
//! # JSON Output Types
//!
//! - [`IssueList`] - One page of issues with the total count (list)
//! - [`IssueDetails`] - Issue with a page of comments (show)
//! - [`ActionResult`] - Outcome of a mutating command
//! - [`SyncSummary`] - Outcome of pull/merge

mod output;
mod text;

pub use output::{ActionResult, IssueDetails, IssueList, SyncSummary};
pub use text::{
    format_comment, format_date, format_issue_details, format_issue_line, format_status_icon, truncate_to_width,
};

use serde::Serialize;

use crate::error::Result;

/// Print `value` as pretty JSON on stdout.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
