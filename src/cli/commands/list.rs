//! List command implementation.

use issue_core::{IssueError, IssuePage};

use crate::branch::{BranchManager, Changes};
use crate::cli::ListArgs;
use crate::error::Result;
use crate::format::{self, IssueList, format_issue_line};

/// Execute the list command.
///
/// # Errors
///
/// Returns `Validation` for page 0 or limit 0, or an error if an issue
/// cannot be read.
pub fn execute(args: &ListArgs, manager: &BranchManager<'_>, json: bool) -> Result<()> {
    if args.page == 0 {
        return Err(IssueError::validation("page", "pages start at 1").into());
    }
    if args.limit == 0 {
        return Err(IssueError::validation("limit", "must be at least 1").into());
    }

    let scoped = manager.run_scoped("list", false, |store| {
        let page = match args.status {
            None => store.list(args.page, args.limit)?,
            Some(status) => {
                let matching: Vec<_> = store
                    .all()?
                    .into_iter()
                    .filter(|issue| issue.status == status)
                    .collect();
                let total = matching.len();
                let start = (args.page - 1).saturating_mul(args.limit);
                let issues = matching.into_iter().skip(start).take(args.limit).collect();
                IssuePage { issues, total }
            }
        };
        Ok(Changes::none(page))
    })?;

    let IssuePage { issues, total } = scoped.value;
    if json {
        return format::print_json(&IssueList {
            issues,
            total,
            page: args.page,
            limit: args.limit,
        });
    }

    if issues.is_empty() {
        println!("No issues found.");
        return Ok(());
    }
    for issue in &issues {
        println!("{}", format_issue_line(issue));
    }
    if total > issues.len() {
        println!(
            "\nShowing {} of {total} issues (page {}).",
            issues.len(),
            args.page
        );
    }
    Ok(())
}
