//! Issue-branch lifecycle.
//!
//! Every operation on issue data runs inside one session: attach the issue
//! branch as a linked worktree, act on it, optionally stage and commit,
//! then detach. Detaching is tied to [`AttachedBranch`]'s `Drop`, so it
//! happens on every exit path.

mod interrupt;

pub use interrupt::Interrupts;

use issue_core::{IssueId, IssueStore};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{GitIssueError, Result};
use crate::git::Git;
use crate::prompt::Confirm;
use crate::workspace::Workspace;

/// Message of the first commit on a freshly created issue branch.
pub const BOOTSTRAP_MESSAGE: &str = "Initialize issue branch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attachment {
    Attached,
    Released,
    Kept,
}

/// The issue branch checked out in its worktree.
///
/// Dropping the guard removes the worktree, discarding whatever an
/// unfinished action wrote. A worktree inherited from an earlier session is
/// only removed if clean. Removal failures are logged, never panicked on.
#[derive(Debug)]
pub struct AttachedBranch<'w> {
    workspace: &'w Workspace,
    path: PathBuf,
    state: Attachment,
    /// Attached by an earlier session (for example, one that stopped on
    /// manual conflicts).
    reused: bool,
}

impl<'w> AttachedBranch<'w> {
    const fn new(workspace: &'w Workspace, path: PathBuf, reused: bool) -> Self {
        Self {
            workspace,
            path,
            state: Attachment::Attached,
            reused,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Git bound to the worktree.
    #[must_use]
    pub fn git(&self) -> Git {
        Git::new(&self.path)
    }

    #[must_use]
    pub fn store(&self) -> IssueStore {
        self.workspace.store_at(&self.path)
    }

    /// Detach now, reporting failure.
    ///
    /// A worktree inherited from an earlier session that git refuses to
    /// remove is left in place with a warning instead.
    ///
    /// # Errors
    ///
    /// Returns `Git` if git refuses to remove the worktree (for example,
    /// because it has uncommitted changes).
    pub fn release(mut self) -> Result<()> {
        self.state = Attachment::Released;
        match detach(self.workspace.git(), &self.path, false) {
            Err(e) if self.reused => {
                tracing::warn!(path = %self.path.display(), error = %e, "issue worktree still has unfinished work; leaving it attached");
                Ok(())
            }
            other => other,
        }
    }

    /// Leave the worktree attached for the user to inspect.
    #[must_use]
    pub fn keep(mut self) -> PathBuf {
        self.state = Attachment::Kept;
        tracing::info!(path = %self.path.display(), "leaving issue worktree attached");
        self.path.clone()
    }
}

impl Drop for AttachedBranch<'_> {
    fn drop(&mut self) {
        if self.state != Attachment::Attached {
            return;
        }
        let force = !self.reused;
        if let Err(e) = detach(self.workspace.git(), &self.path, force) {
            tracing::warn!(path = %self.path.display(), force, error = %e, "failed to release issue worktree");
        }
    }
}

fn detach(git: &Git, path: &Path, force: bool) -> Result<()> {
    git.worktree_remove(path, force)?;
    git.worktree_prune()?;
    tracing::debug!(path = %path.display(), "released issue worktree");
    Ok(())
}

/// What an action changed, plus its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changes<T> {
    pub value: T,
    /// Files written or deleted by the action.
    pub paths: Vec<PathBuf>,
    /// Issue named in the commit message.
    pub subject: Option<IssueId>,
}

impl<T> Changes<T> {
    #[must_use]
    pub const fn new(value: T, paths: Vec<PathBuf>) -> Self {
        Self {
            value,
            paths,
            subject: None,
        }
    }

    /// A read-only result.
    #[must_use]
    pub const fn none(value: T) -> Self {
        Self::new(value, Vec::new())
    }

    #[must_use]
    pub fn on(mut self, id: IssueId) -> Self {
        self.subject = Some(id);
        self
    }
}

/// Result of [`BranchManager::run_scoped`].
#[derive(Debug)]
pub struct Scoped<T> {
    pub value: T,
    /// Whether a commit was made on the issue branch.
    pub committed: bool,
    /// Set when the commit succeeded but publishing it did not.
    pub push_error: Option<GitIssueError>,
}

/// Commit message for an action.
#[must_use]
pub fn commit_message(label: &str, subject: Option<&IssueId>) -> String {
    subject.map_or_else(
        || format!("Action {label} performed"),
        |id| format!("Action {label} performed on issue: {id}"),
    )
}

/// Attaches, bootstraps and detaches the issue branch.
pub struct BranchManager<'w> {
    workspace: &'w Workspace,
    confirm: &'w dyn Confirm,
}

impl<'w> BranchManager<'w> {
    #[must_use]
    pub fn new(workspace: &'w Workspace, confirm: &'w dyn Confirm) -> Self {
        Self { workspace, confirm }
    }

    #[must_use]
    pub const fn workspace(&self) -> &'w Workspace {
        self.workspace
    }

    // ========================================================================
    // Acquire
    // ========================================================================

    /// Make sure the issue branch is checked out in its worktree.
    ///
    /// Reuses a live worktree. Otherwise finds the branch locally or on the
    /// remote, bootstrapping an empty orphan branch if neither has it, and
    /// attaches it.
    ///
    /// # Errors
    ///
    /// Returns `DirtyWorkingTree` or `Declined` if bootstrap cannot proceed,
    /// `Declined` if the worktree path is occupied and the user will not
    /// clear it, or `WorktreeAttach`/`Git` on git failures.
    pub fn ensure_branch_ready(&self) -> Result<AttachedBranch<'w>> {
        let path = self.workspace.worktree_path();
        if self.has_live_worktree(&path)? {
            tracing::debug!(path = %path.display(), "reusing attached issue worktree");
            return Ok(AttachedBranch::new(self.workspace, path, true));
        }

        self.ensure_local_branch()?;
        self.attach(&path)?;
        Ok(AttachedBranch::new(self.workspace, path, false))
    }

    fn has_live_worktree(&self, path: &Path) -> Result<bool> {
        let git = self.workspace.git();
        let config = self.workspace.config();
        let Some(entry) = git
            .worktrees()?
            .into_iter()
            .find(|entry| same_path(&entry.path, path))
        else {
            return Ok(false);
        };

        if entry.prunable || !path.is_dir() {
            tracing::info!(path = %path.display(), "pruning stale worktree metadata");
            git.worktree_prune()?;
            return Ok(false);
        }
        if entry.branch.as_deref() != Some(config.branch.as_str()) {
            return Err(GitIssueError::WorktreeAttach {
                path: path.to_path_buf(),
                reason: format!(
                    "a worktree for {} is already there",
                    entry.branch.as_deref().unwrap_or("a detached HEAD")
                ),
            });
        }
        Ok(true)
    }

    fn ensure_local_branch(&self) -> Result<()> {
        let git = self.workspace.git();
        let config = self.workspace.config();
        if git.has_local_branch(&config.branch)? {
            return Ok(());
        }

        if git.has_remote(&config.remote)? {
            let on_remote = git.has_remote_tracking_branch(&config.remote, &config.branch)?
                || git
                    .remote_has_branch(&config.remote, &config.branch)
                    .unwrap_or_else(|e| {
                        tracing::warn!(remote = %config.remote, error = %e, "could not query remote");
                        false
                    });
            if on_remote {
                git.fetch(&config.remote, &config.branch)?;
                git.create_tracking_branch(&config.remote, &config.branch)?;
                tracing::info!(branch = %config.branch, remote = %config.remote, "created local issue branch from remote");
                return Ok(());
            }
        }

        self.bootstrap()
    }

    /// Create the issue branch as an empty orphan and try to publish it.
    ///
    /// Refuses to run on a dirty checkout, and asks first.
    ///
    /// # Errors
    ///
    /// Returns `DirtyWorkingTree` if the main checkout has changes,
    /// `Declined` if the user says no, or `Git` if the branch cannot be
    /// created. A failed publish is only logged.
    pub fn bootstrap(&self) -> Result<()> {
        let git = self.workspace.git();
        let config = self.workspace.config();

        let dirty = git.status_porcelain()?;
        if !dirty.is_empty() {
            return Err(GitIssueError::DirtyWorkingTree { paths: dirty });
        }

        let question = format!(
            "Issue branch '{}' does not exist yet. Create it?",
            config.branch
        );
        if !self.confirm.confirm(&question)? {
            return Err(GitIssueError::declined(format!(
                "creating issue branch '{}'",
                config.branch
            )));
        }

        git.create_orphan_branch(&config.branch, BOOTSTRAP_MESSAGE)?;

        if git.has_remote(&config.remote)? {
            if let Err(e) = git.push(&config.remote, &config.branch) {
                tracing::warn!(remote = %config.remote, error = %e, "could not publish the new issue branch");
            }
        }
        Ok(())
    }

    fn attach(&self, path: &Path) -> Result<()> {
        let config = self.workspace.config();
        if path.exists() {
            let question = format!(
                "{} exists but is not the issue worktree. Delete it permanently?",
                path.display()
            );
            if !self.confirm.confirm_destructive(&question)? {
                return Err(GitIssueError::declined(format!("deleting {}", path.display())));
            }
            if path.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
            tracing::warn!(path = %path.display(), "deleted directory occupying the worktree path");
        }

        self.workspace
            .git()
            .worktree_add(path, &config.branch)
            .map_err(|e| GitIssueError::WorktreeAttach {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        self.exclude_worktree()?;
        tracing::debug!(path = %path.display(), branch = %config.branch, "attached issue worktree");
        Ok(())
    }

    /// Keep the worktree out of `git status` in the main checkout.
    fn exclude_worktree(&self) -> Result<()> {
        let info = self.workspace.git().common_dir()?.join("info");
        let exclude = info.join("exclude");
        let dir = self.workspace.config().worktree_dir.to_string_lossy().replace('\\', "/");
        let pattern = format!("/{}/", dir.trim_end_matches('/'));

        let existing = fs::read_to_string(&exclude).unwrap_or_default();
        if existing.lines().any(|line| line.trim() == pattern) {
            return Ok(());
        }
        fs::create_dir_all(&info)?;
        let mut file = fs::OpenOptions::new().create(true).append(true).open(&exclude)?;
        if !existing.is_empty() && !existing.ends_with('\n') {
            writeln!(file)?;
        }
        writeln!(file, "{pattern}")?;
        Ok(())
    }

    // ========================================================================
    // Scoped actions
    // ========================================================================

    /// Run `action` against the issue store inside one session.
    ///
    /// With `publish`, the paths the action reports are staged and committed
    /// with a message built from `label` and the action's subject, and the
    /// commit is pushed if `auto_push` is on. The worktree is released on
    /// every path, including errors and interrupts; a failed push is
    /// returned in [`Scoped::push_error`] rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns any error from acquiring the branch or from `action`, or
    /// `Interrupted` if a signal arrived.
    pub fn run_scoped<T, F>(&self, label: &str, publish: bool, action: F) -> Result<Scoped<T>>
    where
        F: FnOnce(&IssueStore) -> Result<Changes<T>>,
    {
        let interrupts = Interrupts::install()?;
        let branch = self
            .ensure_branch_ready()
            .map_err(|e| interrupts.explain(e))?;

        let store = branch.store();
        let changes = action(&store).map_err(|e| interrupts.explain(e))?;
        interrupts.check()?;

        let mut committed = false;
        if publish && !changes.paths.is_empty() {
            let git = branch.git();
            let relative: Vec<PathBuf> = changes.paths.iter().map(|p| store.relative(p)).collect();
            git.add(&relative).map_err(|e| interrupts.explain(e))?;
            committed = git
                .commit(&commit_message(label, changes.subject.as_ref()))
                .map_err(|e| interrupts.explain(e))?;
        }
        branch.release()?;

        let push_error = if committed && self.workspace.config().auto_push {
            self.publish().err()
        } else {
            None
        };
        if let Some(e) = &push_error {
            tracing::warn!(error = %e, "committed locally but could not push");
        }

        Ok(Scoped {
            value: changes.value,
            committed,
            push_error,
        })
    }

    /// Push the issue branch from the main checkout. No-op without a
    /// configured remote.
    ///
    /// # Errors
    ///
    /// Returns `Git` with the transport diagnostics if the push fails.
    pub fn publish(&self) -> Result<()> {
        let git = self.workspace.git();
        let config = self.workspace.config();
        if !git.has_remote(&config.remote)? {
            tracing::debug!(remote = %config.remote, "no such remote; not pushing");
            return Ok(());
        }
        git.push(&config.remote, &config.branch)?;
        tracing::info!(remote = %config.remote, branch = %config.branch, "pushed issue branch");
        Ok(())
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    let canonical = |p: &Path| dunce::canonicalize(p).unwrap_or_else(|_| p.to_path_buf());
    a == b || canonical(a) == canonical(b)
}
