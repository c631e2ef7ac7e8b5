use issue_core::{Comment, Issue, MergeReport};
use serde::Serialize;
use std::path::PathBuf;

/// One page of issues for list view.
#[derive(Debug, Clone, Serialize)]
pub struct IssueList {
    pub issues: Vec<Issue>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Issue with a page of its comments for show view.
#[derive(Debug, Clone, Serialize)]
pub struct IssueDetails {
    #[serde(flatten)]
    pub issue: Issue,
    pub comments: Vec<Comment>,
    pub comment_total: usize,
}

/// Result of a mutating command.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult<T> {
    #[serde(flatten)]
    pub value: T,
    pub committed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push_error: Option<String>,
}

/// Result of pull or merge.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub state: &'static str,
    pub resolved: Vec<PathBuf>,
    pub renumbered: usize,
    pub diverged: usize,
    pub comment_indices: usize,
    pub moved_comments: usize,
}

impl SyncSummary {
    #[must_use]
    pub fn clean() -> Self {
        Self {
            state: "clean",
            resolved: Vec::new(),
            renumbered: 0,
            diverged: 0,
            comment_indices: 0,
            moved_comments: 0,
        }
    }

    #[must_use]
    pub fn merged(report: &MergeReport) -> Self {
        Self {
            state: "merged",
            resolved: report.resolved.clone(),
            renumbered: report.created,
            diverged: report.diverged,
            comment_indices: report.comment_indices,
            moved_comments: report.moved_comments,
        }
    }
}
