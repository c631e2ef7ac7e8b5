//! Edit command implementation.

use issue_core::IssueError;

use super::{finish, parse_actor, parse_id};
use crate::branch::{BranchManager, Changes};
use crate::cli::EditArgs;
use crate::error::Result;
use crate::format::format_issue_details;

/// Execute the edit command. Only the given fields change.
///
/// # Errors
///
/// Returns `Validation` if no field was given, `IssueNotFound` if the id
/// is unknown, or a lifecycle error.
pub fn execute(args: EditArgs, manager: &BranchManager<'_>, json: bool) -> Result<()> {
    let id = parse_id(&args.id, &manager.workspace().config().prefix)?;
    if args.summary.is_none()
        && args.description.is_none()
        && args.assignee.is_none()
        && args.reporter.is_none()
        && args.status.is_none()
    {
        return Err(IssueError::validation("edit", "nothing to change").into());
    }
    let assignee = parse_actor(args.assignee.as_deref())?;
    let reporter = parse_actor(args.reporter.as_deref())?;

    let scoped = manager.run_scoped("edit", true, |store| {
        let mut issue = store.require(&id)?;
        if let Some(summary) = args.summary {
            issue.summary = summary;
        }
        if let Some(description) = args.description {
            issue.description = Some(description);
        }
        if assignee.is_some() {
            issue.assignee = assignee;
        }
        if reporter.is_some() {
            issue.reporter = reporter;
        }
        if let Some(status) = args.status {
            issue.status = status;
        }

        let paths = store.update(&issue)?;
        Ok(Changes::new(issue, paths).on(id))
    })?;

    finish(scoped, json, |issue| format_issue_details(issue, &[], 0))
}
