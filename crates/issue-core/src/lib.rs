//! `issue-core`: issue documents stored on a git branch, and the semantic
//! merge that keeps concurrently allocated ids unique.
//!
//! This crate knows nothing about git itself. It reads and writes JSON
//! documents under a directory (the checked-out issue branch) and turns the
//! stages of an unmerged path into typed conflicts.
//!
//! # Quick Start
//!
//! ```no_run
//! use issue_core::{Issue, IssueId, IssueStore, Layout};
//!
//! let store = IssueStore::new("path/to/worktree", "ISSUE", Layout::default());
//!
//! // Allocate the next id and persist
//! let draft = Issue::new(IssueId::new("ISSUE", 0), "Build fails on arm64");
//! let (issue, written) = store.create(draft).unwrap();
//!
//! // Page through issues
//! let page = store.list(1, 20).unwrap();
//! ```

pub mod document;
pub mod error;
pub mod index;
pub mod merge;
pub mod model;
pub mod registry;
pub mod store;

pub use document::{Document, DocumentKind};
pub use error::{IssueError, Result};
pub use index::{CommentIndex, IndexEntry};
pub use merge::{ConflictInfo, ConflictType, MergeReport, Merger, ResolutionPolicy};
pub use model::{Actor, Comment, DEFAULT_PREFIX, Issue, IssueId, Status};
pub use registry::Registry;
pub use store::{IndexLocation, IssuePage, IssueStore, Layout};
