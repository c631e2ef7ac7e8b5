//! `git_issue` - distributed issue tracker on an isolated git branch
//!
//! Issues, comments and the id registry live as JSON documents on their
//! own branch, which is attached as a linked worktree only while a command
//! runs. Concurrent edits are reconciled by ordinary git merges plus the
//! semantic resolvers in [`issue_core::merge`].
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`cli`] - Command-line interface using clap
//! - [`branch`] - Issue-branch lifecycle (attach, bootstrap, scoped actions)
//! - [`sync`] - Push, pull and conflict resolution
//! - [`git`] - Git process invocation
//! - [`workspace`] - Per-invocation repository context
//! - [`config`] - Configuration management
//! - [`prompt`] - Confirmations and interactive field resolution
//! - [`error`] - Error types and exit codes
//! - [`format`] - Output formatting (text, JSON)
//! - [`logging`] - Tracing subscriber setup

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod branch;
pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod git;
pub mod logging;
pub mod prompt;
pub mod sync;
pub mod workspace;

pub use cli::run;
pub use error::{GitIssueError, Result};
