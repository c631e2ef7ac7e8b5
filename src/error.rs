//! Error types for `git_issue`.

use issue_core::IssueError;
use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a confirmation the user declined.
pub const EXIT_DECLINED: i32 = 2;
/// Exit code when a merge stopped on conflicts that need a human.
pub const EXIT_MANUAL_CONFLICTS: i32 = 3;
/// Exit code after SIGINT/SIGTERM.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Primary error type for git-issue operations.
#[derive(Error, Debug)]
pub enum GitIssueError {
    /// Error raised by the issue store or a resolver.
    #[error(transparent)]
    Core(#[from] IssueError),

    // === Repository Errors ===
    /// The starting directory is not inside a git repository.
    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    /// The main checkout has uncommitted changes, so the issue branch
    /// cannot be bootstrapped safely.
    #[error(
        "Refusing to create the issue branch: the working tree has uncommitted changes\n{}",
        display_lines(.paths)
    )]
    DirtyWorkingTree { paths: Vec<String> },

    /// The issue branch could not be attached as a worktree.
    #[error("Failed to attach worktree at {path}: {reason}")]
    WorktreeAttach { path: PathBuf, reason: String },

    /// A git invocation exited unsuccessfully.
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    // === Control Flow ===
    /// The user answered "no" to a confirmation.
    #[error("Aborted: {action} was declined")]
    Declined { action: String },

    /// Conflicts remain that no resolver could handle.
    #[error(
        "Automatic merge stopped; resolve these paths in {worktree} and commit:\n{}",
        display_paths(.paths)
    )]
    ManualConflicts { worktree: PathBuf, paths: Vec<PathBuf> },

    /// SIGINT or SIGTERM arrived during a session.
    #[error("Interrupted")]
    Interrupted,

    // === Configuration Errors ===
    /// Invalid configuration value or file.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML configuration error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON output error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GitIssueError {
    #[must_use]
    pub fn git(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::Git {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn declined(action: impl Into<String>) -> Self {
        Self::Declined {
            action: action.into(),
        }
    }

    /// Whether this is an expected stop rather than a failure.
    #[must_use]
    pub const fn is_user_abort(&self) -> bool {
        matches!(self, Self::Declined { .. } | Self::Interrupted)
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Declined { .. } => EXIT_DECLINED,
            Self::ManualConflicts { .. } => EXIT_MANUAL_CONFLICTS,
            Self::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

fn display_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("  {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type using `GitIssueError`.
pub type Result<T> = std::result::Result<T, GitIssueError>;
