//! Tagged JSON documents stored on the issue branch.
//!
//! Every file carries a `"kind"` discriminator so a merge stage can be
//! decoded without guessing from its field set.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::{IssueError, Result};
use crate::index::CommentIndex;
use crate::model::{Comment, Issue};
use crate::registry::Registry;

/// Any document that can appear on the issue branch.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    Issue(Issue),
    Comment(Comment),
    CommentIndex(CommentIndex),
    Tracker(Registry),
}

impl Document {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Issue(_) => Issue::KIND,
            Self::Comment(_) => Comment::KIND,
            Self::CommentIndex(_) => CommentIndex::KIND,
            Self::Tracker(_) => Registry::KIND,
        }
    }

    /// Decode a document from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `Decode` naming `path` if the text is not a tagged document.
    pub fn decode(path: &Path, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| IssueError::decode(path, e))
    }
}

/// Borrowed view used when writing, so callers need not clone.
#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentRef<'a> {
    Issue(&'a Issue),
    Comment(&'a Comment),
    CommentIndex(&'a CommentIndex),
    Tracker(&'a Registry),
}

/// A concrete document type with a fixed discriminator.
pub trait DocumentKind: Sized {
    const KIND: &'static str;

    fn as_document(&self) -> DocumentRef<'_>;

    fn from_document(doc: Document) -> std::result::Result<Self, Document>;
}

macro_rules! document_kind {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl DocumentKind for $ty {
            const KIND: &'static str = $name;

            fn as_document(&self) -> DocumentRef<'_> {
                DocumentRef::$variant(self)
            }

            fn from_document(doc: Document) -> std::result::Result<Self, Document> {
                match doc {
                    Document::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

document_kind!(Issue, Issue, "issue");
document_kind!(Comment, Comment, "comment");
document_kind!(CommentIndex, CommentIndex, "comment_index");
document_kind!(Registry, Tracker, "tracker");

/// Serialize a document to pretty JSON with its discriminator.
///
/// # Errors
///
/// Returns `Json` if serialization fails.
pub fn encode<T: DocumentKind>(value: &T) -> Result<String> {
    let mut text = serde_json::to_string_pretty(&value.as_document())?;
    text.push('\n');
    Ok(text)
}

/// Read a document of a specific kind.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, `Decode` if it is not a valid
/// document, or `UnexpectedDocument` if it is a different kind.
pub fn read<T: DocumentKind>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)?;
    let doc = Document::decode(path, &text)?;
    T::from_document(doc).map_err(|other| IssueError::UnexpectedDocument {
        path: path.to_path_buf(),
        expected: T::KIND,
        found: other.kind_name(),
    })
}

/// Read a document, treating a missing file as `None`.
///
/// # Errors
///
/// Same as [`read`], except a missing file is not an error.
pub fn read_optional<T: DocumentKind>(path: &Path) -> Result<Option<T>> {
    match read(path) {
        Ok(value) => Ok(Some(value)),
        Err(IssueError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write a document, creating parent directories as needed.
///
/// Uses write-to-temp + rename so a crash never leaves a half-written file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn write<T: DocumentKind>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = encode(value)?;

    let tmp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    tracing::trace!(path = %path.display(), kind = T::KIND, "wrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Actor, IssueId};

    #[test]
    fn test_issue_document_carries_kind() {
        let issue = Issue::new(IssueId::new("ISSUE", 1), "Broken build");
        let text = encode(&issue).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["kind"], "issue");
        assert_eq!(value["id"], "ISSUE-1");
    }

    #[test]
    fn test_decode_dispatches_on_kind() {
        let comment = Comment::new("looks good", Actor::new("a", "a@test.com"));
        let text = encode(&comment).unwrap();
        let doc = Document::decode(Path::new("c.json"), &text).unwrap();
        assert_eq!(doc.kind_name(), "comment");
        assert_eq!(doc, Document::Comment(comment));
    }

    #[test]
    fn test_untagged_json_is_rejected() {
        let err = Document::decode(Path::new("x.json"), r#"{"issue_count": 3}"#).unwrap_err();
        assert!(matches!(err, IssueError::Decode { .. }));
    }

    #[test]
    fn test_read_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.json");
        write(&path, &Registry::new("ISSUE")).unwrap();

        let err = read::<Issue>(&path).unwrap_err();
        assert!(matches!(
            err,
            IssueError::UnexpectedDocument {
                expected: "issue",
                found: "tracker",
                ..
            }
        ));
    }

    #[test]
    fn test_read_optional_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = read_optional::<Registry>(&dir.path().join("nope.json")).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ISSUE-4").join("issue.json");
        let issue = Issue::new(IssueId::new("ISSUE", 4), "nested");
        write(&path, &issue).unwrap();
        assert_eq!(read::<Issue>(&path).unwrap(), issue);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
