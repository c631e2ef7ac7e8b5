//! Error types for `issue-core`.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Primary error type for issue-core operations.
#[derive(Error, Debug)]
pub enum IssueError {
    // === Issue Errors ===
    /// Issue with the specified ID was not found.
    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    /// Issue ID format is invalid.
    #[error("Invalid issue ID '{id}' (expected {prefix}-<number>)")]
    InvalidId { id: String, prefix: String },

    /// Invalid status value.
    #[error("Invalid status: {status}")]
    InvalidStatus { status: String },

    // === Validation Errors ===
    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    // === Document Errors ===
    /// A stored document could not be decoded.
    #[error("Failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// A document decoded to a different kind than the caller expected.
    #[error("Unexpected document at {path}: expected {expected}, found {found}")]
    UnexpectedDocument {
        path: PathBuf,
        expected: &'static str,
        found: &'static str,
    },

    /// A comment index references a file that no longer exists.
    #[error("Invalid comment index in {folder}: entry '{entry}' is missing; the index needs to be rebuilt")]
    InvalidIndex { folder: PathBuf, entry: String },

    // === Merge Errors ===
    /// A create-edit divergence had no authoritative issue to match against.
    #[error(
        "Failed to discern the diverged stage: no resolved issue matches \
         ours ({ours_id}, {ours_uuid}) or theirs ({theirs_id}, {theirs_uuid})"
    )]
    DivergenceMatchMissing {
        ours_id: String,
        ours_uuid: Uuid,
        theirs_id: String,
        theirs_uuid: Uuid,
    },

    /// A resolution policy could not produce a value.
    #[error("Resolution aborted for field '{field}': {reason}")]
    ResolutionAborted { field: String, reason: String },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IssueError {
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type using `IssueError`.
pub type Result<T> = std::result::Result<T, IssueError>;
