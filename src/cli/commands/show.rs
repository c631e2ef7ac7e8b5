//! Show command implementation.

use super::parse_id;
use crate::branch::{BranchManager, Changes};
use crate::cli::ShowArgs;
use crate::error::Result;
use crate::format::{self, IssueDetails, format_issue_details};

/// Execute the show command.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue does not exist, `InvalidIndex` if
/// the comment index names a missing comment, or a lifecycle error.
pub fn execute(args: &ShowArgs, manager: &BranchManager<'_>, json: bool) -> Result<()> {
    let id = parse_id(&args.id, &manager.workspace().config().prefix)?;

    let scoped = manager.run_scoped("show", false, |store| {
        let issue = store.require(&id)?;
        let comment_total = store.comment_index(&id)?.len();
        let comments = if args.comments {
            store.comments(&id, args.comment_offset, args.comment_limit)?
        } else {
            Vec::new()
        };
        Ok(Changes::none(IssueDetails {
            issue,
            comments,
            comment_total,
        }))
    })?;

    let details = scoped.value;
    if json {
        format::print_json(&details)?;
    } else {
        print!(
            "{}",
            format_issue_details(&details.issue, &details.comments, details.comment_total)
        );
    }
    Ok(())
}
