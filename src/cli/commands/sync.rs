//! Push, pull and merge commands.

use issue_core::merge::ResolutionPolicy;

use crate::error::Result;
use crate::format::{self, SyncSummary};
use crate::sync::{PullOutcome, Synchronizer};

/// Execute the push command.
///
/// # Errors
///
/// Returns `Config` if there is nothing to push, or the transport error.
pub fn push(mut sync: Synchronizer<'_>, json: bool) -> Result<()> {
    sync.push()?;
    if json {
        format::print_json(&serde_json::json!({ "state": "pushed" }))
    } else {
        println!("Pushed issue branch.");
        Ok(())
    }
}

/// Execute the pull command.
///
/// # Errors
///
/// Returns the pull error, or `ManualConflicts` if conflicts remain after
/// automatic resolution.
pub fn pull<P: ResolutionPolicy>(
    mut sync: Synchronizer<'_>,
    with_merge: bool,
    policy: P,
    json: bool,
) -> Result<()> {
    let summary = match sync.pull(with_merge, policy)? {
        PullOutcome::Clean => SyncSummary::clean(),
        PullOutcome::Merged(report) => SyncSummary::merged(&report),
    };
    print_summary(&summary, json)
}

/// Execute the merge command.
///
/// # Errors
///
/// Returns `ManualConflicts` if conflicts remain after automatic
/// resolution, or a resolver error.
pub fn merge<P: ResolutionPolicy>(mut sync: Synchronizer<'_>, policy: P, json: bool) -> Result<()> {
    let report = sync.merge(policy)?;
    let summary = if report.resolved.is_empty() {
        SyncSummary::clean()
    } else {
        SyncSummary::merged(&report)
    };
    print_summary(&summary, json)
}

fn print_summary(summary: &SyncSummary, json: bool) -> Result<()> {
    if json {
        return format::print_json(summary);
    }
    if summary.resolved.is_empty() {
        println!("Issue branch is up to date.");
        return Ok(());
    }
    println!(
        "Merged: {} renumbered, {} diverged, {} comment indices, {} comments moved.",
        summary.renumbered, summary.diverged, summary.comment_indices, summary.moved_comments
    );
    for path in &summary.resolved {
        println!("  resolved {}", path.display());
    }
    Ok(())
}
