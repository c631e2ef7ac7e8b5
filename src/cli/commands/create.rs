//! Create command implementation.

use issue_core::{Issue, IssueId};

use super::{finish, parse_actor};
use crate::branch::{BranchManager, Changes};
use crate::cli::CreateArgs;
use crate::error::Result;

/// Execute the create command.
///
/// The reporter defaults to the git user, who is also subscribed.
///
/// # Errors
///
/// Returns an error if validation fails, the issue branch cannot be
/// attached, or the issue cannot be written and committed.
pub fn execute(args: CreateArgs, manager: &BranchManager<'_>, json: bool) -> Result<()> {
    let user = manager.workspace().git().user()?;
    let assignee = parse_actor(args.assignee.as_deref())?;
    let reporter = parse_actor(args.reporter.as_deref())?.unwrap_or_else(|| user.clone());

    let scoped = manager.run_scoped("create", true, |store| {
        // The store allocates the real id.
        let mut issue = Issue::new(IssueId::new(store.prefix(), 0), args.summary);
        issue.description = args.description;
        issue.assignee = assignee;
        issue.reporter = Some(reporter);
        issue.subscribe(user);

        let (issue, paths) = store.create(issue)?;
        let id = issue.id.clone();
        Ok(Changes::new(issue, paths).on(id))
    })?;

    finish(scoped, json, |issue| format!("Created {}: {}", issue.id, issue.summary))
}
