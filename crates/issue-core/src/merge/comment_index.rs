//! Comment-index conflicts: both branches appended comments.

use std::path::PathBuf;

use crate::document::{self, Document};
use crate::error::Result;
use crate::index::CommentIndex;
use crate::merge::conflict::{ConflictInfo, ConflictType};
use crate::store::IssueStore;

/// The merged index for one conflicting path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentIndexResolution {
    /// Path relative to the store root.
    pub path: PathBuf,
    pub index: CommentIndex,
}

impl CommentIndexResolution {
    /// Write the merged index over the conflicted file.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be written.
    pub fn apply(&self, store: &IssueStore) -> Result<Vec<PathBuf>> {
        let path = store.absolute(&self.path);
        document::write(&path, &self.index)?;
        Ok(vec![path])
    }
}

/// Union every stage of a comment-index conflict.
///
/// Returns `None` for conflicts of any other kind.
#[must_use]
pub fn resolve_comment_index(conflict: &ConflictInfo) -> Option<CommentIndexResolution> {
    if conflict.kind != ConflictType::CommentIndex {
        return None;
    }
    let indices = conflict.versions.iter().filter_map(|v| match &v.document {
        Some(Document::CommentIndex(index)) => Some(index),
        _ => None,
    });
    let index = CommentIndex::merge(indices);
    tracing::debug!(path = %conflict.path.display(), entries = index.len(), "merged comment index");
    Some(CommentIndexResolution {
        path: conflict.path.clone(),
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexEntry;
    use crate::merge::conflict::{Stage, StagedVersion};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn entry(path: &str, minute: u32) -> IndexEntry {
        IndexEntry::new(path, Utc.with_ymd_and_hms(2018, 2, 25, 10, minute, 0).unwrap())
    }

    fn staged(stage: Stage, entries: Vec<IndexEntry>) -> StagedVersion {
        StagedVersion {
            stage,
            document: Some(Document::CommentIndex(CommentIndex::new(entries))),
        }
    }

    #[test]
    fn test_union_of_all_stages() {
        let conflict = ConflictInfo::new(
            "ISSUE-1/comments/index.json",
            vec![
                staged(Stage::Base, vec![entry("p0.json", 0)]),
                staged(Stage::Ours, vec![entry("p0.json", 0), entry("p1.json", 1), entry("p2.json", 5)]),
                staged(Stage::Theirs, vec![entry("p0.json", 0), entry("p3.json", 3), entry("p2.json", 5)]),
            ],
        );

        let resolution = resolve_comment_index(&conflict).unwrap();
        let paths: Vec<&str> = resolution.index.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["p0.json", "p1.json", "p3.json", "p2.json"]);
    }

    #[test]
    fn test_other_kinds_are_skipped() {
        let conflict = ConflictInfo::new("README.md", vec![StagedVersion {
            stage: Stage::Ours,
            document: None,
        }]);
        assert!(resolve_comment_index(&conflict).is_none());
    }

    #[test]
    fn test_apply_overwrites_conflicted_file() {
        let dir = TempDir::new().unwrap();
        let store = IssueStore::new(dir.path(), "ISSUE", crate::store::Layout::default());
        let resolution = CommentIndexResolution {
            path: PathBuf::from("ISSUE-1/comments/index.json"),
            index: CommentIndex::new(vec![entry("p1.json", 1)]),
        };

        let written = resolution.apply(&store).unwrap();
        assert_eq!(written, vec![dir.path().join("ISSUE-1/comments/index.json")]);
        let index: CommentIndex = document::read(&written[0]).unwrap();
        assert_eq!(index.len(), 1);
    }
}
