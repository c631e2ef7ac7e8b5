//! Per-issue ledger of comment files.
//!
//! Comments are read through the index rather than by scanning the
//! comments directory, which keeps pagination cheap and ordering stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One comment file and its creation date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    /// File name relative to the comments directory.
    pub path: String,
    pub date: DateTime<Utc>,
}

impl IndexEntry {
    #[must_use]
    pub fn new(path: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            date,
        }
    }
}

/// Ordered comment index for a single issue.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentIndex {
    #[serde(default)]
    pub entries: Vec<IndexEntry>,
}

impl CommentIndex {
    #[must_use]
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry. Entries are never reordered outside of a merge.
    pub fn add_entry(&mut self, path: impl Into<String>, date: DateTime<Utc>) {
        self.entries.push(IndexEntry::new(path, date));
    }

    #[must_use]
    pub fn has_entry(&self, path: &str) -> bool {
        self.entries.iter().any(|e| e.path == path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in `[offset, offset + limit)`, clamped to the index bounds.
    #[must_use]
    pub fn page(&self, offset: usize, limit: usize) -> &[IndexEntry] {
        let start = offset.min(self.entries.len());
        let end = start.saturating_add(limit).min(self.entries.len());
        &self.entries[start..end]
    }

    /// Union several indices for the same issue.
    ///
    /// Entries are de-duplicated on `(path, date)` and sorted ascending by
    /// date, with the path as a tiebreak so the result is deterministic.
    #[must_use]
    pub fn merge<'a>(indices: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<IndexEntry> = indices
            .into_iter()
            .flat_map(|index| index.entries.iter())
            .filter(|entry| seen.insert((*entry).clone()))
            .cloned()
            .collect();

        entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.path.cmp(&b.path)));
        Self { entries }
    }
}
