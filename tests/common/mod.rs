#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Output, Stdio};
use tempfile::TempDir;

/// Captured result of one `git-issue` invocation.
pub struct Run {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl Run {
    fn from_output(output: &Output) -> Self {
        Self {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.stdout)
            .unwrap_or_else(|e| panic!("stdout is not JSON ({e}):\n{}", self.stdout))
    }
}

/// A sandbox holding an optional bare remote and any number of clones.
///
/// `HOME` and `XDG_CONFIG_HOME` point inside the sandbox so no user
/// configuration leaks into the tests.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::create_dir_all(dir.path().join("home")).expect("create home");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn home(&self) -> PathBuf {
        self.path().join("home")
    }

    /// Run git with the sandbox environment, panicking on failure.
    pub fn git(&self, cwd: &Path, args: &[&str]) -> String {
        let output = std::process::Command::new("git")
            .args(args)
            .current_dir(cwd)
            .env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .expect("spawn git");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// Create the bare remote all clones share.
    pub fn remote(&self) -> PathBuf {
        let bare = self.path().join("remote.git");
        if !bare.exists() {
            self.git(self.path(), &["init", "--bare", "--quiet", "remote.git"]);
        }
        bare
    }

    /// A repository with one commit on its default branch and no remote.
    pub fn local_repo(&self, name: &str, user: &str) -> PathBuf {
        let repo = self.path().join(name);
        fs::create_dir_all(&repo).expect("create repo dir");
        self.git(&repo, &["init", "--quiet"]);
        self.identify(&repo, user);
        self.initial_commit(&repo);
        repo
    }

    /// Clone the bare remote, committing and pushing `main` if the remote
    /// is still empty.
    pub fn clone_repo(&self, name: &str, user: &str) -> PathBuf {
        let bare = self.remote();
        let repo = self.path().join(name);
        self.git(
            self.path(),
            &["clone", "--quiet", &bare.to_string_lossy(), name],
        );
        self.identify(&repo, user);
        let has_commits = !self.git(&bare, &["for-each-ref", "refs/heads"]).is_empty();
        if !has_commits {
            self.initial_commit(&repo);
            self.git(&repo, &["push", "--quiet", "origin", "HEAD"]);
        }
        repo
    }

    fn identify(&self, repo: &Path, user: &str) {
        self.git(repo, &["config", "user.name", user]);
        self.git(repo, &["config", "user.email", &format!("{user}@test.com")]);
        self.git(repo, &["config", "commit.gpgsign", "false"]);
    }

    fn initial_commit(&self, repo: &Path) {
        fs::write(repo.join("README.md"), "project\n").expect("write readme");
        self.git(repo, &["add", "README.md"]);
        self.git(repo, &["commit", "--quiet", "-m", "initial"]);
    }

    /// Run `git-issue` in `repo`.
    pub fn run(&self, repo: &Path, args: &[&str]) -> Run {
        self.run_with_stdin(repo, args, "")
    }

    pub fn run_with_stdin(&self, repo: &Path, args: &[&str], stdin: &str) -> Run {
        let output = Command::cargo_bin("git-issue")
            .expect("binary built")
            .args(args)
            .current_dir(repo)
            .env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_ISSUE_LOG", "error")
            .env_remove("GIT_ISSUE_BRANCH")
            .env_remove("GIT_ISSUE_WORKTREE")
            .env_remove("GIT_ISSUE_REMOTE")
            .env_remove("GIT_ISSUE_PREFIX")
            .write_stdin(stdin)
            .output()
            .expect("run git-issue");
        Run::from_output(&output)
    }

    /// Start `git-issue` in `repo` with piped stdin and stderr, without
    /// waiting for it.
    pub fn spawn(&self, repo: &Path, args: &[&str]) -> Child {
        std::process::Command::new(env!("CARGO_BIN_EXE_git-issue"))
            .args(args)
            .current_dir(repo)
            .env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_ISSUE_LOG", "error")
            .env_remove("GIT_ISSUE_BRANCH")
            .env_remove("GIT_ISSUE_WORKTREE")
            .env_remove("GIT_ISSUE_REMOTE")
            .env_remove("GIT_ISSUE_PREFIX")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn git-issue")
    }

    /// Commit `contents` at `path` on the issue branch through a scratch
    /// worktree, bypassing git-issue.
    pub fn commit_on_issue_branch(&self, repo: &Path, path: &str, contents: &str) {
        let wt = self.path().join("scratch-wt");
        self.git(repo, &["worktree", "add", "--quiet", &wt.to_string_lossy(), "issue"]);
        let file = wt.join(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&file, contents).expect("write file");
        self.git(&wt, &["add", path]);
        self.git(&wt, &["commit", "--quiet", "-m", "edit behind git-issue"]);
        self.git(repo, &["worktree", "remove", &wt.to_string_lossy()]);
    }

    /// Run `git-issue` and require success.
    pub fn ok(&self, repo: &Path, args: &[&str]) -> Run {
        let run = self.run(repo, args);
        assert!(
            run.status.success(),
            "git-issue {args:?} failed ({:?})\nstdout: {}\nstderr: {}",
            run.code(),
            run.stdout,
            run.stderr
        );
        run
    }
}
