//! Thin wrapper over the `git` executable.
//!
//! Every call runs with an explicit working directory; nothing here ever
//! changes the process's current directory.

use issue_core::Actor;
use issue_core::merge::{Stage, UnmergedBlob};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::{GitIssueError, Result};

/// A registered linked worktree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeEntry {
    pub path: PathBuf,
    /// Short branch name, if a branch is checked out.
    pub branch: Option<String>,
    /// Git considers this worktree's directory missing.
    pub prunable: bool,
}

/// Runs git commands in one directory.
#[derive(Debug, Clone)]
pub struct Git {
    dir: PathBuf,
}

impl Git {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Top-level directory of the repository containing `start`.
    ///
    /// # Errors
    ///
    /// Returns `NotARepository` if `start` is not inside a work tree.
    pub fn discover(start: &Path) -> Result<PathBuf> {
        let git = Self::new(start);
        let top = git
            .run(&["rev-parse", "--show-toplevel"])
            .map_err(|_| GitIssueError::NotARepository {
                path: start.to_path_buf(),
            })?;
        Ok(dunce::canonicalize(&top).unwrap_or_else(|_| PathBuf::from(top)))
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    fn output(&self, args: &[&str], input: Option<&[u8]>) -> Result<Output> {
        tracing::debug!(dir = %self.dir.display(), "git {}", args.join(" "));
        let mut cmd = self.command(args);
        let output = match input {
            None => cmd.output()?,
            Some(bytes) => {
                cmd.stdin(Stdio::piped());
                let mut child = cmd.spawn()?;
                if let Some(mut stdin) = child.stdin.take() {
                    stdin.write_all(bytes)?;
                }
                child.wait_with_output()?
            }
        };
        Ok(output)
    }

    fn check(args: &[&str], output: Output) -> Result<Output> {
        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Err(GitIssueError::git(
            args.join(" "),
            if stderr.is_empty() { stdout } else { stderr },
        ))
    }

    /// Run git and return trimmed stdout.
    ///
    /// # Errors
    ///
    /// Returns `Git` with the command and its stderr if git exits non-zero,
    /// or `Io` if git cannot be spawned.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = Self::check(args, self.output(args, None)?)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git feeding `input` on stdin.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run).
    pub fn run_with_input(&self, args: &[&str], input: &[u8]) -> Result<String> {
        let output = Self::check(args, self.output(args, Some(input))?)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Run git and report only whether it exited successfully.
    ///
    /// # Errors
    ///
    /// Returns `Io` if git cannot be spawned.
    pub fn succeeds(&self, args: &[&str]) -> Result<bool> {
        Ok(self.output(args, None)?.status.success())
    }

    // ========================================================================
    // Repository state
    // ========================================================================

    /// The shared `.git` directory (the main repository's, even from a
    /// linked worktree).
    ///
    /// # Errors
    ///
    /// Returns `Git` if this is not a repository.
    pub fn common_dir(&self) -> Result<PathBuf> {
        let dir = PathBuf::from(self.run(&["rev-parse", "--git-common-dir"])?);
        Ok(if dir.is_absolute() {
            dir
        } else {
            self.dir.join(dir)
        })
    }

    /// Paths reported by `git status --porcelain`, including untracked files.
    ///
    /// # Errors
    ///
    /// Returns `Git` if status cannot be read.
    pub fn status_porcelain(&self) -> Result<Vec<String>> {
        Ok(self
            .run(&["status", "--porcelain"])?
            .lines()
            .map(str::to_string)
            .filter(|line| !line.is_empty())
            .collect())
    }

    /// # Errors
    ///
    /// Returns `Io` if git cannot be spawned.
    pub fn has_local_branch(&self, branch: &str) -> Result<bool> {
        self.succeeds(&["show-ref", "--verify", "--quiet", &format!("refs/heads/{branch}")])
    }

    /// # Errors
    ///
    /// Returns `Io` if git cannot be spawned.
    pub fn has_remote_tracking_branch(&self, remote: &str, branch: &str) -> Result<bool> {
        self.succeeds(&[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/remotes/{remote}/{branch}"),
        ])
    }

    /// # Errors
    ///
    /// Returns `Git` if remotes cannot be listed.
    pub fn has_remote(&self, remote: &str) -> Result<bool> {
        Ok(self.run(&["remote"])?.lines().any(|line| line.trim() == remote))
    }

    /// Ask the remote whether it has `branch`.
    ///
    /// # Errors
    ///
    /// Returns `Git` if the remote cannot be reached.
    pub fn remote_has_branch(&self, remote: &str, branch: &str) -> Result<bool> {
        let heads = self.run(&["ls-remote", "--heads", remote, branch])?;
        Ok(!heads.is_empty())
    }

    /// Author identity as git would record it (config or `GIT_AUTHOR_*`).
    ///
    /// # Errors
    ///
    /// Returns `Config` if git has no usable author identity.
    pub fn user(&self) -> Result<Actor> {
        let ident = self.run(&["var", "GIT_AUTHOR_IDENT"]).map_err(|_| {
            GitIssueError::Config(
                "no git identity; run `git config user.email <you@example.com>`".to_string(),
            )
        })?;
        parse_ident(&ident)
    }

    // ========================================================================
    // Branches
    // ========================================================================

    /// Create `branch` pointing at a parentless commit of the empty tree.
    ///
    /// Uses plumbing only, so the current checkout and index are never
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns `Git` if any step fails (for example, no committer identity).
    pub fn create_orphan_branch(&self, branch: &str, message: &str) -> Result<String> {
        let tree = self.run_with_input(&["hash-object", "-t", "tree", "-w", "--stdin"], b"")?;
        let commit = self.run(&["commit-tree", &tree, "-m", message])?;
        self.run(&["branch", branch, &commit])?;
        tracing::info!(branch, commit = %commit, "created orphan branch");
        Ok(commit)
    }

    /// Fetch one branch into its remote-tracking ref.
    ///
    /// # Errors
    ///
    /// Returns `Git` if the fetch fails.
    pub fn fetch(&self, remote: &str, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{branch}:refs/remotes/{remote}/{branch}");
        self.run(&["fetch", remote, &refspec])?;
        Ok(())
    }

    /// Create a local branch tracking `<remote>/<branch>`.
    ///
    /// # Errors
    ///
    /// Returns `Git` if the branch cannot be created.
    pub fn create_tracking_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["branch", "--track", branch, &format!("{remote}/{branch}")])?;
        Ok(())
    }

    // ========================================================================
    // Worktrees
    // ========================================================================

    /// Parse `git worktree list --porcelain`.
    ///
    /// # Errors
    ///
    /// Returns `Git` if worktrees cannot be listed.
    pub fn worktrees(&self) -> Result<Vec<WorktreeEntry>> {
        let listing = self.run(&["worktree", "list", "--porcelain"])?;
        Ok(parse_worktrees(&listing))
    }

    /// # Errors
    ///
    /// Returns `Git` if the worktree cannot be added.
    pub fn worktree_add(&self, path: &Path, branch: &str) -> Result<()> {
        self.run(&["worktree", "add", &path.to_string_lossy(), branch])?;
        Ok(())
    }

    /// Remove a linked worktree. Without `force`, git refuses when it holds
    /// local modifications.
    ///
    /// # Errors
    ///
    /// Returns `Git` if git refuses to remove it.
    pub fn worktree_remove(&self, path: &Path, force: bool) -> Result<()> {
        let path = path.to_string_lossy();
        let mut args = vec!["worktree", "remove"];
        if force {
            args.push("--force");
        }
        args.push(&path);
        self.run(&args)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Git` if pruning fails.
    pub fn worktree_prune(&self) -> Result<()> {
        self.run(&["worktree", "prune"])?;
        Ok(())
    }

    // ========================================================================
    // Commits and transport
    // ========================================================================

    /// Stage `paths`, including deletions.
    ///
    /// # Errors
    ///
    /// Returns `Git` if staging fails.
    pub fn add(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let rendered: Vec<String> = paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        let mut args = vec!["add", "--all", "--"];
        args.extend(rendered.iter().map(String::as_str));
        self.run(&args)?;
        Ok(())
    }

    /// Whether the index differs from HEAD.
    ///
    /// # Errors
    ///
    /// Returns `Io` if git cannot be spawned.
    pub fn has_staged_changes(&self) -> Result<bool> {
        Ok(!self.succeeds(&["diff", "--cached", "--quiet"])?)
    }

    /// Commit the index. Returns `false` without committing when nothing is
    /// staged, unless a merge is being concluded.
    ///
    /// # Errors
    ///
    /// Returns `Git` if the commit fails.
    pub fn commit(&self, message: &str) -> Result<bool> {
        if !self.has_staged_changes()? && !self.merge_in_progress()? {
            tracing::debug!("nothing staged; skipping commit");
            return Ok(false);
        }
        self.run(&["commit", "--quiet", "-m", message])?;
        Ok(true)
    }

    /// # Errors
    ///
    /// Returns `Io` if git cannot be spawned.
    pub fn merge_in_progress(&self) -> Result<bool> {
        self.succeeds(&["rev-parse", "--quiet", "--verify", "MERGE_HEAD"])
    }

    /// # Errors
    ///
    /// Returns `Git` if there is no merge to abort.
    pub fn merge_abort(&self) -> Result<()> {
        self.run(&["merge", "--abort"])?;
        Ok(())
    }

    /// Merge-pull one branch. Histories need not be related, since each
    /// replica may have bootstrapped its own issue branch.
    ///
    /// # Errors
    ///
    /// Returns `Git` with git's diagnostics if the pull fails, including
    /// when it stops on conflicts.
    pub fn pull(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&[
            "pull",
            "--no-rebase",
            "--no-edit",
            "--allow-unrelated-histories",
            remote,
            branch,
        ])?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Git` with git's diagnostics if the push is rejected.
    pub fn push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(&["push", remote, &format!("refs/heads/{branch}:refs/heads/{branch}")])?;
        Ok(())
    }

    /// Content of `path` at `rev`, or `None` if it does not exist there.
    ///
    /// # Errors
    ///
    /// Returns `Io` if git cannot be spawned.
    pub fn show_file(&self, rev: &str, path: &Path) -> Result<Option<String>> {
        let spec = format!("{rev}:{}", path.to_string_lossy().replace('\\', "/"));
        let output = self.output(&["show", &spec], None)?;
        Ok(output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).into_owned()))
    }

    /// Every stage of every unmerged path, with blob contents.
    ///
    /// # Errors
    ///
    /// Returns `Git` if the index or a blob cannot be read.
    pub fn unmerged(&self) -> Result<Vec<UnmergedBlob>> {
        let listing = self.run(&["ls-files", "--unmerged", "-z"])?;
        let mut blobs = Vec::new();
        for (sha, stage, path) in parse_unmerged(&listing) {
            let content = self.run(&["cat-file", "blob", &sha])?;
            blobs.push(UnmergedBlob {
                path,
                stage,
                content,
            });
        }
        Ok(blobs)
    }
}

/// Parse `ls-files --unmerged -z` output into `(sha, stage, path)`.
fn parse_unmerged(listing: &str) -> Vec<(String, Stage, PathBuf)> {
    listing
        .split('\0')
        .filter_map(|record| {
            let (meta, path) = record.split_once('\t')?;
            let mut fields = meta.split_whitespace();
            let _mode = fields.next()?;
            let sha = fields.next()?;
            let stage = fields.next()?.parse().ok().and_then(Stage::from_number)?;
            Some((sha.to_string(), stage, PathBuf::from(path)))
        })
        .collect()
}

fn parse_worktrees(listing: &str) -> Vec<WorktreeEntry> {
    let mut entries = Vec::new();
    let mut current: Option<WorktreeEntry> = None;
    for line in listing.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            entries.extend(current.take());
            current = Some(WorktreeEntry {
                path: PathBuf::from(path),
                branch: None,
                prunable: false,
            });
        } else if let Some(entry) = current.as_mut() {
            if let Some(branch) = line.strip_prefix("branch ") {
                entry.branch = Some(branch.trim_start_matches("refs/heads/").to_string());
            } else if line.starts_with("prunable") {
                entry.prunable = true;
            }
        }
    }
    entries.extend(current);
    entries
}

/// Parse `Name <email> <timestamp> <tz>` into an actor.
fn parse_ident(ident: &str) -> Result<Actor> {
    let person = ident
        .rfind('>')
        .map_or(ident, |end| &ident[..=end]);
    person
        .parse()
        .map_err(|e| GitIssueError::Config(format!("unusable git identity '{ident}': {e}")))
}
