mod common;
use common::Sandbox;

use std::path::PathBuf;

fn repo_with_issues(sandbox: &Sandbox, summaries: &[&str]) -> PathBuf {
    let repo = sandbox.local_repo("project", "ann");
    for summary in summaries {
        sandbox.ok(&repo, &["--yes", "create", "-s", summary]);
    }
    repo
}

#[test]
fn test_create_json_output() {
    let sandbox = Sandbox::new();
    let repo = sandbox.local_repo("project", "ann");

    let run = sandbox.ok(
        &repo,
        &[
            "--yes",
            "--json",
            "create",
            "-s",
            "Login fails",
            "-d",
            "Steps to reproduce",
            "-a",
            "Bo <bo@test.com>",
        ],
    );
    let json = run.json();
    assert_eq!(json["id"], "ISSUE-1");
    assert_eq!(json["summary"], "Login fails");
    assert_eq!(json["status"], "open");
    assert_eq!(json["assignee"]["email"], "bo@test.com");
    assert_eq!(json["reporter"]["email"], "ann@test.com");
    assert_eq!(json["subscribers"][0]["email"], "ann@test.com");
    assert_eq!(json["committed"], true);
    assert!(json.get("push_error").is_none());
}

#[test]
fn test_ids_are_sequential() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["one", "two"]);
    let run = sandbox.ok(&repo, &["create", "-s", "three"]);
    assert!(run.stdout.contains("Created ISSUE-3"), "{}", run.stdout);
}

#[test]
fn test_edit_changes_only_given_fields() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Original"]);

    sandbox.ok(&repo, &["edit", "ISSUE-1", "-d", "More detail", "--status", "closed"]);

    let json = sandbox.ok(&repo, &["--json", "show", "ISSUE-1"]).json();
    assert_eq!(json["summary"], "Original");
    assert_eq!(json["description"], "More detail");
    assert_eq!(json["status"], "closed");

    let log = sandbox.git(&repo, &["log", "-1", "--format=%s", "issue"]);
    assert_eq!(log, "Action edit performed on issue: ISSUE-1");
}

#[test]
fn test_edit_without_fields_is_rejected() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Original"]);
    let run = sandbox.run(&repo, &["edit", "1"]);
    assert_eq!(run.code(), Some(1));
    assert!(run.stderr.contains("nothing to change"), "{}", run.stderr);
}

#[test]
fn test_status_shorthands() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Work item"]);

    sandbox.ok(&repo, &["active", "ISSUE-1"]);
    let json = sandbox.ok(&repo, &["--json", "show", "1"]).json();
    assert_eq!(json["status"], "in_progress");

    sandbox.ok(&repo, &["close", "1"]);
    let commits_before = sandbox.git(&repo, &["rev-list", "--count", "issue"]);
    let run = sandbox.ok(&repo, &["--json", "close", "1"]);
    assert_eq!(run.json()["committed"], false);
    assert_eq!(
        sandbox.git(&repo, &["rev-list", "--count", "issue"]),
        commits_before
    );

    sandbox.ok(&repo, &["open", "1"]);
    let json = sandbox.ok(&repo, &["--json", "show", "1"]).json();
    assert_eq!(json["status"], "open");
}

#[test]
fn test_unknown_issue() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Only one"]);
    let run = sandbox.run(&repo, &["show", "ISSUE-9"]);
    assert_eq!(run.code(), Some(1));
    assert!(run.stderr.contains("Issue not found: ISSUE-9"), "{}", run.stderr);
    assert!(!repo.join("issue").exists(), "worktree released after error");
}

#[test]
fn test_comments_paginate() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Discussed"]);
    for text in ["first", "second", "third"] {
        sandbox.ok(&repo, &["comment", "ISSUE-1", "-c", text]);
    }

    let json = sandbox
        .ok(
            &repo,
            &[
                "--json",
                "show",
                "ISSUE-1",
                "--comments",
                "--comment-offset",
                "1",
                "--comment-limit",
                "1",
            ],
        )
        .json();
    assert_eq!(json["comment_total"], 3);
    let comments = json["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "second");
    assert_eq!(comments[0]["author"]["email"], "ann@test.com");

    let text = sandbox.ok(&repo, &["show", "ISSUE-1"]).stdout;
    assert!(text.contains("3 comment(s)"), "{text}");
}

#[test]
fn test_missing_comment_reports_invalid_index() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Discussed"]);
    sandbox.ok(&repo, &["comment", "1", "-c", "soon gone"]);

    // Delete the comment file behind the index's back.
    let wt = sandbox.path().join("scratch-wt");
    sandbox.git(&repo, &["worktree", "add", "--quiet", &wt.to_string_lossy(), "issue"]);
    let files = sandbox.git(&wt, &["ls-files", "ISSUE-1/comments"]);
    let comment = files
        .lines()
        .find(|f| !f.ends_with("index.json"))
        .unwrap()
        .to_string();
    sandbox.git(&wt, &["rm", "--quiet", &comment]);
    sandbox.git(&wt, &["commit", "--quiet", "-m", "drop comment"]);
    sandbox.git(&repo, &["worktree", "remove", &wt.to_string_lossy()]);

    let run = sandbox.run(&repo, &["show", "1", "--comments"]);
    assert_eq!(run.code(), Some(1));
    assert!(run.stderr.contains("Invalid comment index"), "{}", run.stderr);
    assert!(run.stderr.contains("ISSUE-1"), "{}", run.stderr);
}

#[test]
fn test_empty_comment_rejected() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Discussed"]);
    let run = sandbox.run(&repo, &["comment", "1", "-c", "  "]);
    assert_eq!(run.code(), Some(1));
    assert!(run.stderr.contains("comment"), "{}", run.stderr);
}

#[test]
fn test_list_pages_and_filters() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["a", "b", "c", "d", "e"]);
    sandbox.ok(&repo, &["close", "2"]);
    sandbox.ok(&repo, &["close", "4"]);

    let json = sandbox
        .ok(&repo, &["--json", "list", "--page", "2", "--limit", "2"])
        .json();
    assert_eq!(json["total"], 5);
    let ids: Vec<&str> = json["issues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["ISSUE-3", "ISSUE-4"]);

    let json = sandbox
        .ok(&repo, &["--json", "list", "--status", "closed"])
        .json();
    assert_eq!(json["total"], 2);

    let text = sandbox.ok(&repo, &["list", "--limit", "3"]).stdout;
    assert!(text.contains("○ ISSUE-1 a"), "{text}");
    assert!(text.contains("✓ ISSUE-2 b"), "{text}");
    assert!(text.contains("Showing 3 of 5"), "{text}");
}

#[test]
fn test_list_rejects_page_zero() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["a"]);
    let run = sandbox.run(&repo, &["list", "--page", "0"]);
    assert_eq!(run.code(), Some(1));
}

#[test]
fn test_subscribe_round_trip() {
    let sandbox = Sandbox::new();
    let repo = repo_with_issues(&sandbox, &["Watched"]);

    // The creator is already subscribed.
    let run = sandbox.ok(&repo, &["subscribe", "1"]);
    assert!(run.stdout.contains("already subscribed"), "{}", run.stdout);

    sandbox.ok(&repo, &["unsubscribe", "1"]);
    let json = sandbox.ok(&repo, &["--json", "show", "1"]).json();
    assert!(json["subscribers"].as_array().unwrap().is_empty());

    let run = sandbox.ok(&repo, &["subscribe", "1"]);
    assert!(run.stdout.contains("Subscribed ann@test.com to ISSUE-1"), "{}", run.stdout);
}

#[test]
fn test_completions() {
    let sandbox = Sandbox::new();
    let run = sandbox.ok(sandbox.path(), &["completions", "bash"]);
    assert!(run.stdout.contains("git-issue"));
}

#[test]
fn test_help_lists_commands() {
    use assert_cmd::Command;
    use predicates::prelude::*;

    Command::cargo_bin("git-issue")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("pull"))
        .stdout(predicate::str::contains("--with-merge").not());
}

#[test]
fn test_version_flag() {
    use assert_cmd::Command;
    use predicates::prelude::*;

    Command::cargo_bin("git-issue")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("git-issue "));
}
