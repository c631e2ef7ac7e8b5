//! Command implementations.
//!
//! Each command runs inside one [`BranchManager`](crate::branch::BranchManager)
//! session and prints either text or JSON.

pub mod comment;
pub mod completions;
pub mod create;
pub mod edit;
pub mod list;
pub mod show;
pub mod status;
pub mod subscribe;
pub mod sync;

use issue_core::{Actor, IssueId};
use serde::Serialize;

use crate::branch::Scoped;
use crate::error::Result;
use crate::format::{self, ActionResult};

/// Parse `ISSUE-3`, or a bare `3` under the configured prefix.
///
/// # Errors
///
/// Returns `InvalidId` if `raw` is neither form.
pub fn parse_id(raw: &str, prefix: &str) -> Result<IssueId> {
    let raw = raw.trim();
    if let Ok(number) = raw.parse::<u64>() {
        return Ok(IssueId::new(prefix, number));
    }
    Ok(IssueId::parse_with_prefix(raw, prefix)?)
}

/// Parse an optional `--assignee`/`--reporter` value.
///
/// # Errors
///
/// Returns `Validation` if the value has no email address.
pub fn parse_actor(raw: Option<&str>) -> Result<Option<Actor>> {
    Ok(raw.map(str::parse).transpose()?)
}

/// Print the outcome of a mutating command.
///
/// A failed push is already logged as a warning; JSON output carries it
/// as `push_error`.
///
/// # Errors
///
/// Returns `Json` if JSON output cannot be serialized.
pub fn finish<T: Serialize>(
    scoped: Scoped<T>,
    json: bool,
    render: impl FnOnce(&T) -> String,
) -> Result<()> {
    if json {
        format::print_json(&ActionResult {
            push_error: scoped.push_error.as_ref().map(ToString::to_string),
            committed: scoped.committed,
            value: scoped.value,
        })
    } else {
        println!("{}", render(&scoped.value));
        Ok(())
    }
}
