//! Push, pull and merge of the issue branch.
//!
//! This module handles:
//! - Push: publish the local issue branch, never retried automatically
//! - Pull: merge the remote issue branch into the worktree
//! - Merge: classify and resolve the conflicts a pull left behind, then
//!   finalize the merge commit only if nothing needs a human
//!
//! ```text
//! Idle → Pulling → Clean
//!              └→ Conflicted → (resolved) Clean
//!                            └→ (manual)   Conflicted, worktree kept
//! ```

use issue_core::merge::{
    ConflictInfo, FieldDiff, FieldValue, Merger, MergeReport, ResolutionPolicy, Stage, UnmergedBlob,
    parse_conflicts, unconflicted_index_paths,
};
use issue_core::{Issue, IssueError, IssueStore};

use crate::branch::{AttachedBranch, BranchManager, Interrupts};
use crate::error::{GitIssueError, Result};
use crate::git::Git;

/// Commit message that concludes an automatically resolved merge.
pub const MERGE_MESSAGE: &str = "merge conflict resolution";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    Idle,
    Pulling,
    Clean,
    Conflicted,
}

/// Outcome of a successful pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// Fast-forward or clean textual merge.
    Clean,
    /// Conflicts were resolved automatically and committed.
    Merged(MergeReport),
}

/// Drives one sync operation.
pub struct Synchronizer<'w> {
    manager: BranchManager<'w>,
    state: SyncState,
}

impl<'w> Synchronizer<'w> {
    #[must_use]
    pub const fn new(manager: BranchManager<'w>) -> Self {
        Self {
            manager,
            state: SyncState::Idle,
        }
    }

    fn enter(&mut self, next: SyncState) {
        tracing::debug!(from = ?self.state, to = ?next, "sync state");
        self.state = next;
    }

    /// Publish the issue branch.
    ///
    /// # Errors
    ///
    /// Returns `Config` if there is no issue branch or no such remote, or
    /// `Git` with the transport diagnostics if the push is rejected.
    pub fn push(&mut self) -> Result<()> {
        let workspace = self.manager.workspace();
        let git = workspace.git();
        let config = workspace.config();
        if !git.has_local_branch(&config.branch)? {
            return Err(GitIssueError::Config(format!(
                "issue branch '{}' does not exist; create an issue first",
                config.branch
            )));
        }
        if !git.has_remote(&config.remote)? {
            return Err(GitIssueError::Config(format!(
                "remote '{}' is not configured",
                config.remote
            )));
        }
        self.manager.publish()
    }

    /// Pull the remote issue branch.
    ///
    /// With `with_merge`, a pull that stops on conflicts falls through to
    /// [`merge`](Self::merge)'s resolution. Otherwise the half-done merge is
    /// aborted and the pull error returned.
    ///
    /// # Errors
    ///
    /// Returns the pull's `Git` error, `ManualConflicts` if automatic
    /// resolution left paths for a human, or any resolver error.
    pub fn pull<P: ResolutionPolicy>(&mut self, with_merge: bool, policy: P) -> Result<PullOutcome> {
        let interrupts = Interrupts::install()?;
        let branch = self.manager.ensure_branch_ready()?;
        let git = branch.git();
        let config = self.manager.workspace().config();

        self.enter(SyncState::Pulling);
        let pull_error = match git.pull(&config.remote, &config.branch) {
            Ok(()) => {
                self.enter(SyncState::Clean);
                branch.release()?;
                tracing::info!("issue branch is up to date");
                return Ok(PullOutcome::Clean);
            }
            Err(e) => interrupts.explain(e),
        };

        let unmerged = if matches!(pull_error, GitIssueError::Interrupted) {
            Vec::new()
        } else {
            git.unmerged()?
        };

        if with_merge && !unmerged.is_empty() {
            tracing::info!(paths = unmerged.len(), "pull stopped on conflicts; merging");
            self.enter(SyncState::Conflicted);
            return self
                .resolve(branch, unmerged, policy, &interrupts)
                .map(PullOutcome::Merged);
        }

        self.enter(SyncState::Idle);
        if git.merge_in_progress()? {
            git.merge_abort()?;
        }
        drop(branch);
        Err(pull_error)
    }

    /// Resolve whatever conflicts the worktree currently holds.
    ///
    /// # Errors
    ///
    /// Returns `ManualConflicts` if any path still needs a human, or any
    /// resolver error.
    pub fn merge<P: ResolutionPolicy>(&mut self, policy: P) -> Result<MergeReport> {
        let interrupts = Interrupts::install()?;
        let branch = self.manager.ensure_branch_ready()?;
        let git = branch.git();
        let unmerged = git.unmerged()?;
        if unmerged.is_empty() && !git.merge_in_progress()? {
            tracing::info!("nothing to merge");
            branch.release()?;
            return Ok(MergeReport::default());
        }
        self.enter(SyncState::Conflicted);
        self.resolve(branch, unmerged, policy, &interrupts)
    }

    fn resolve<P: ResolutionPolicy>(
        &mut self,
        branch: AttachedBranch<'w>,
        unmerged: Vec<UnmergedBlob>,
        policy: P,
        interrupts: &Interrupts,
    ) -> Result<MergeReport> {
        let store = branch.store();
        let git = branch.git();
        let conflicts = with_side_indices(&git, &store, parse_conflicts(unmerged))?;
        for conflict in &conflicts {
            tracing::debug!(path = %conflict.path.display(), kind = %conflict.kind, "classified conflict");
        }

        let policy = Interruptible { policy, interrupts };
        let report = match Merger::new(&store, policy).run(&conflicts) {
            Ok(report) => report,
            Err(e) => {
                let err = interrupts.explain(e.into());
                if matches!(err, GitIssueError::Interrupted) {
                    self.enter(SyncState::Idle);
                    if let Err(abort) = git.merge_abort() {
                        tracing::warn!(error = %abort, "could not abort the interrupted merge");
                    }
                    drop(branch);
                } else {
                    let worktree = branch.keep();
                    tracing::warn!(path = %worktree.display(), error = %err, "automatic resolution failed; conflicted worktree left for inspection");
                }
                return Err(err);
            }
        };
        git.add(&report.resolved)?;

        if !report.is_clean() {
            let worktree = branch.keep();
            return Err(GitIssueError::ManualConflicts {
                worktree,
                paths: report.manual,
            });
        }

        git.commit(MERGE_MESSAGE)?;
        self.enter(SyncState::Clean);
        branch.release()?;
        tracing::info!(
            resolved = report.resolved.len(),
            moved_comments = report.moved_comments,
            "merge committed"
        );
        Ok(report)
    }
}

/// Add both branches' versions of the comment indices that merged cleanly
/// in folders whose issues are being renumbered, so the resolver can tell
/// whose comments are whose.
fn with_side_indices(
    git: &Git,
    store: &IssueStore,
    mut conflicts: Vec<ConflictInfo>,
) -> Result<Vec<ConflictInfo>> {
    for path in unconflicted_index_paths(&conflicts, store) {
        let mut stages = Vec::with_capacity(2);
        for (stage, rev) in [(Stage::Ours, "HEAD"), (Stage::Theirs, "MERGE_HEAD")] {
            if let Some(content) = git.show_file(rev, &path)? {
                stages.push((stage, content));
            }
        }
        if !stages.is_empty() {
            tracing::debug!(path = %path.display(), stages = stages.len(), "read both sides of a merged comment index");
            conflicts.push(ConflictInfo::from_stages(path, stages));
        }
    }
    Ok(conflicts)
}

/// Stops asking once a signal has arrived.
struct Interruptible<'a, P> {
    policy: P,
    interrupts: &'a Interrupts,
}

impl<P: ResolutionPolicy> ResolutionPolicy for Interruptible<'_, P> {
    fn choose(&mut self, issue: &Issue, diff: &FieldDiff) -> issue_core::Result<FieldValue> {
        if self.interrupts.triggered() {
            return Err(IssueError::ResolutionAborted {
                field: diff.field.to_string(),
                reason: "interrupted".to_string(),
            });
        }
        self.policy.choose(issue, diff)
    }
}
