//! Subscribe and unsubscribe commands.

use super::{finish, parse_id};
use crate::branch::{BranchManager, Changes};
use crate::error::Result;

/// Add or remove the git user as a subscriber, keyed on email.
///
/// # Errors
///
/// Returns `IssueNotFound` if the issue does not exist, `Config` if git
/// has no user identity, or a lifecycle error.
pub fn execute(raw_id: &str, subscribe: bool, manager: &BranchManager<'_>, json: bool) -> Result<()> {
    let workspace = manager.workspace();
    let id = parse_id(raw_id, &workspace.config().prefix)?;
    let user = workspace.git().user()?;
    let label = if subscribe { "subscribe" } else { "unsubscribe" };

    let scoped = manager.run_scoped(label, true, |store| {
        let mut issue = store.require(&id)?;
        let changed = if subscribe {
            issue.subscribe(user.clone())
        } else {
            issue.unsubscribe(&user)
        };
        if !changed {
            return Ok(Changes::none(issue));
        }
        let paths = store.update(&issue)?;
        Ok(Changes::new(issue, paths).on(id.clone()))
    })?;

    let committed = scoped.committed;
    finish(scoped, json, |issue| match (subscribe, committed) {
        (true, true) => format!("Subscribed {} to {}", user.email, issue.id),
        (true, false) => format!("{} is already subscribed to {}", user.email, issue.id),
        (false, true) => format!("Unsubscribed {} from {}", user.email, issue.id),
        (false, false) => format!("{} was not subscribed to {}", user.email, issue.id),
    })
}
