//! `git-issue` - distributed issue tracker on an isolated git branch.
//!
//! Installed on `PATH`, it also runs as `git issue`.

use git_issue::{GitIssueError, run};

fn main() {
    if let Err(e) = run() {
        let known = e.downcast_ref::<GitIssueError>();
        match known {
            Some(err) if err.is_user_abort() => eprintln!("{err}"),
            _ => eprintln!("Error: {e:#}"),
        }
        std::process::exit(known.map_or(1, GitIssueError::exit_code));
    }
}
