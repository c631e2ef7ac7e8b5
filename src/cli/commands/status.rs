//! `open`, `close` and `active` shorthands.

use issue_core::Status;

use super::{finish, parse_id};
use crate::branch::{BranchManager, Changes};
use crate::error::Result;

/// Commit label for a status shorthand.
const fn label(status: Status) -> &'static str {
    match status {
        Status::Open => "open",
        Status::InProgress => "active",
        Status::Closed => "close",
    }
}

/// Set an issue's status. Nothing is committed if it already has it.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue does not exist, or a lifecycle
/// error.
pub fn execute(raw_id: &str, status: Status, manager: &BranchManager<'_>, json: bool) -> Result<()> {
    let id = parse_id(raw_id, &manager.workspace().config().prefix)?;

    let scoped = manager.run_scoped(label(status), true, |store| {
        let mut issue = store.require(&id)?;
        if issue.status == status {
            return Ok(Changes::none(issue));
        }
        issue.status = status;
        let paths = store.update(&issue)?;
        Ok(Changes::new(issue, paths).on(id.clone()))
    })?;

    finish(scoped, json, |issue| format!("{} is {}", issue.id, issue.status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_command_names() {
        assert_eq!(label(Status::Open), "open");
        assert_eq!(label(Status::InProgress), "active");
        assert_eq!(label(Status::Closed), "close");
    }
}
