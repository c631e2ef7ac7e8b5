//! Text formatting functions for `git_issue`.
//!
//! Provides plain text (non-ANSI) formatting for terminal output:
//! - Status icons (○ ◐ ✓)
//! - Issue line formatting, truncated to a display width
//! - Multi-line issue details with comments

use chrono::{DateTime, Utc};
use issue_core::{Comment, Issue, Status};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Status icon characters.
pub mod icons {
    /// Open issue (hollow circle).
    pub const OPEN: &str = "○";
    /// In progress (half-filled).
    pub const IN_PROGRESS: &str = "◐";
    /// Closed (checkmark).
    pub const CLOSED: &str = "✓";
}

/// Widest summary shown in a list line.
pub const SUMMARY_WIDTH: usize = 72;

#[must_use]
pub const fn format_status_icon(status: &Status) -> &'static str {
    match status {
        Status::Open => icons::OPEN,
        Status::InProgress => icons::IN_PROGRESS,
        Status::Closed => icons::CLOSED,
    }
}

/// Cut `text` to at most `width` terminal columns, marking the cut with `…`.
#[must_use]
pub fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let budget = width.saturating_sub(1);
    let mut used = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Timestamp as shown in issue and comment headers.
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Format a single-line issue summary.
///
/// Format: `{icon} {id} {summary} [@{assignee}]`
#[must_use]
pub fn format_issue_line(issue: &Issue) -> String {
    let summary = truncate_to_width(issue.summary.lines().next().unwrap_or(""), SUMMARY_WIDTH);
    let mut line = format!("{} {} {}", format_status_icon(&issue.status), issue.id, summary);
    if let Some(assignee) = &issue.assignee {
        line.push_str(&format!(" @{}", assignee.email));
    }
    line
}

/// Format one comment with its header line.
#[must_use]
pub fn format_comment(comment: &Comment) -> String {
    format!(
        "--- {} on {}\n{}",
        comment.author,
        format_date(&comment.date),
        comment.text.trim_end()
    )
}

/// Format the full issue view.
#[must_use]
pub fn format_issue_details(issue: &Issue, comments: &[Comment], comment_total: usize) -> String {
    let mut out = format!(
        "{} {} {}\n",
        format_status_icon(&issue.status),
        issue.id,
        issue.summary
    );
    out.push_str(&format!("Status:      {}\n", issue.status));
    out.push_str(&format!("Created:     {}\n", format_date(&issue.date)));
    if let Some(reporter) = &issue.reporter {
        out.push_str(&format!("Reporter:    {reporter}\n"));
    }
    if let Some(assignee) = &issue.assignee {
        out.push_str(&format!("Assignee:    {assignee}\n"));
    }
    if !issue.subscribers.is_empty() {
        let names: Vec<String> = issue.subscribers.iter().map(|s| s.email.clone()).collect();
        out.push_str(&format!("Subscribers: {}\n", names.join(", ")));
    }
    if !issue.attachments.is_empty() {
        out.push_str(&format!("Attachments: {}\n", issue.attachments.join(", ")));
    }
    out.push_str(&format!("UUID:        {}\n", issue.uuid));

    if let Some(description) = issue.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push('\n');
        out.push_str(description.trim_end());
        out.push('\n');
    }

    if comment_total > 0 && comments.is_empty() {
        out.push_str(&format!("\n{comment_total} comment(s); pass --comments to read them\n"));
    } else if comment_total > 0 {
        out.push_str(&format!("\nComments ({} of {comment_total}):\n", comments.len()));
        for comment in comments {
            out.push_str(&format_comment(comment));
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use issue_core::{Actor, IssueId};

    fn make_test_issue() -> Issue {
        Issue::new(IssueId::new("ISSUE", 3), "Test summary")
    }

    #[test]
    fn test_status_icons() {
        assert_eq!(format_status_icon(&Status::Open), "○");
        assert_eq!(format_status_icon(&Status::InProgress), "◐");
        assert_eq!(format_status_icon(&Status::Closed), "✓");
    }

    #[test]
    fn test_format_issue_line_open() {
        let issue = make_test_issue();
        assert_eq!(format_issue_line(&issue), "○ ISSUE-3 Test summary");
    }

    #[test]
    fn test_format_issue_line_assignee() {
        let mut issue = make_test_issue();
        issue.status = Status::InProgress;
        issue.assignee = Some(Actor::new("Ann", "ann@test.com"));
        let line = format_issue_line(&issue);
        assert!(line.starts_with("◐"));
        assert!(line.ends_with("@ann@test.com"));
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 0).unwrap();
        assert_eq!(format_date(&date), "2024-03-09 07:05 UTC");
    }

    #[test]
    fn test_truncate_counts_columns() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefgh", 5), "abcd…");
        // wide characters take two columns each
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn test_details_include_comments() {
        let mut issue = make_test_issue();
        issue.description = Some("Steps to reproduce".to_string());
        let comment = Comment::new("Seen on CI too", Actor::new("Bo", "bo@test.com"));
        let details = format_issue_details(&issue, &[comment], 3);
        assert!(details.contains("Steps to reproduce"));
        assert!(details.contains("Comments (1 of 3)"));
        assert!(details.contains("Bo <bo@test.com>"));
    }
}
