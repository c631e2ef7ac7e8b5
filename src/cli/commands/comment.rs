//! Comment command implementation.

use issue_core::Comment;

use super::{finish, parse_id};
use crate::branch::{BranchManager, Changes};
use crate::cli::CommentArgs;
use crate::error::Result;

/// Execute the comment command.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue does not exist, `Validation` for
/// an empty comment, or a lifecycle error.
pub fn execute(args: CommentArgs, manager: &BranchManager<'_>, json: bool) -> Result<()> {
    let workspace = manager.workspace();
    let id = parse_id(&args.id, &workspace.config().prefix)?;
    let author = workspace.git().user()?;

    let scoped = manager.run_scoped("comment", true, |store| {
        let comment = Comment::new(args.comment, author);
        let paths = store.add_comment(&id, &comment)?;
        Ok(Changes::new(comment, paths).on(id.clone()))
    })?;

    finish(scoped, json, |_| format!("Commented on {id}"))
}
