//! Issue store over a checked-out issue branch.
//!
//! Layout, relative to the branch root:
//!
//! ```text
//! tracker.json
//! <id>/issue.json
//! <id>/comments/<short-uuid>.json
//! <id>/comments/index.json      (or <id>/index.json)
//! ```
//!
//! Every mutating call returns the paths it wrote so the caller can stage
//! exactly those files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::document;
use crate::error::{IssueError, Result};
use crate::index::CommentIndex;
use crate::model::{Comment, Issue, IssueId};
use crate::registry::Registry;

/// File name of the allocation registry at the branch root.
pub const TRACKER_FILE: &str = "tracker.json";
const ISSUE_FILE: &str = "issue.json";
const COMMENTS_DIR: &str = "comments";
const INDEX_FILE: &str = "index.json";

/// Where each issue's comment index lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexLocation {
    /// `<id>/comments/index.json`
    #[default]
    Comments,
    /// `<id>/index.json`
    Issue,
}

/// On-disk layout options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub index_location: IndexLocation,
    pub short_uuid_len: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            index_location: IndexLocation::Comments,
            short_uuid_len: 8,
        }
    }
}

/// One page of issues plus the total number available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    pub total: usize,
}

/// Document store rooted at the issue branch working tree.
#[derive(Debug, Clone)]
pub struct IssueStore {
    root: PathBuf,
    prefix: String,
    layout: Layout,
}

impl IssueStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>, layout: Layout) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            layout,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    // ========================================================================
    // Paths
    // ========================================================================

    #[must_use]
    pub fn issue_dir(&self, id: &IssueId) -> PathBuf {
        self.root.join(id.to_string())
    }

    #[must_use]
    pub fn issue_path(&self, id: &IssueId) -> PathBuf {
        self.issue_dir(id).join(ISSUE_FILE)
    }

    #[must_use]
    pub fn comments_dir(&self, id: &IssueId) -> PathBuf {
        self.issue_dir(id).join(COMMENTS_DIR)
    }

    #[must_use]
    pub fn index_path(&self, id: &IssueId) -> PathBuf {
        match self.layout.index_location {
            IndexLocation::Comments => self.comments_dir(id).join(INDEX_FILE),
            IndexLocation::Issue => self.issue_dir(id).join(INDEX_FILE),
        }
    }

    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.root.join(TRACKER_FILE)
    }

    /// Make `path` relative to the store root, if it lies beneath it.
    #[must_use]
    pub fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
    }

    /// Resolve a path reported relative to the branch root.
    #[must_use]
    pub fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Load the registry; a missing document means an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be decoded.
    pub fn load_registry(&self) -> Result<Registry> {
        Ok(document::read_optional(&self.registry_path())?
            .unwrap_or_else(|| Registry::new(self.prefix.clone())))
    }

    /// Persist the registry and return its path.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be written.
    pub fn save_registry(&self, registry: &Registry) -> Result<PathBuf> {
        let path = self.registry_path();
        document::write(&path, registry)?;
        Ok(path)
    }

    // ========================================================================
    // Issues
    // ========================================================================

    #[must_use]
    pub fn exists(&self, id: &IssueId) -> bool {
        self.issue_path(id).is_file()
    }

    /// Read an issue, returning `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the document exists but cannot be decoded.
    pub fn get(&self, id: &IssueId) -> Result<Option<Issue>> {
        document::read_optional(&self.issue_path(id))
    }

    /// Read an issue that must exist.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if there is no such issue.
    pub fn require(&self, id: &IssueId) -> Result<Issue> {
        self.get(id)?.ok_or_else(|| IssueError::IssueNotFound { id: id.to_string() })
    }

    /// Find an issue by uuid through the registry.
    ///
    /// The registry entry is only trusted if the document at that id still
    /// carries the same uuid.
    ///
    /// # Errors
    ///
    /// Returns an error if the referenced document cannot be decoded.
    pub fn get_by_uuid(&self, registry: &Registry, uuid: Uuid) -> Result<Option<Issue>> {
        let Some(id) = registry.resolve(uuid) else {
            return Ok(None);
        };
        Ok(self.get(id)?.filter(|issue| issue.uuid == uuid))
    }

    /// Write an issue under its current id.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the document cannot be written.
    pub fn write_issue(&self, issue: &Issue) -> Result<PathBuf> {
        let path = self.issue_path(&issue.id);
        document::write(&path, issue)?;
        Ok(path)
    }

    /// Allocate the next id for `issue`, persist it and the registry.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the issue is invalid, or `Io` on write failure.
    pub fn create(&self, mut issue: Issue) -> Result<(Issue, Vec<PathBuf>)> {
        validate(&issue)?;
        let mut registry = self.load_registry()?;

        let mut id = registry.reserve_next_id();
        while self.exists(&id) {
            tracing::warn!(%id, "registry trails the issue branch; skipping occupied id");
            id = registry.reserve_next_id();
        }
        issue.id = id;
        registry.record(issue.uuid, issue.id.clone());

        let issue_path = self.write_issue(&issue)?;
        let registry_path = self.save_registry(&registry)?;
        tracing::info!(id = %issue.id, uuid = %issue.uuid, "created issue");
        Ok((issue, vec![issue_path, registry_path]))
    }

    /// Overwrite an existing issue. The id and uuid cannot change.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue does not exist, or `Validation`
    /// if the stored document belongs to a different uuid.
    pub fn update(&self, issue: &Issue) -> Result<Vec<PathBuf>> {
        validate(issue)?;
        let current = self.require(&issue.id)?;
        if current.uuid != issue.uuid {
            return Err(IssueError::validation(
                "uuid",
                format!("{} is held by a different issue", issue.id),
            ));
        }
        if current.date != issue.date {
            return Err(IssueError::validation("date", "creation date cannot change"));
        }
        Ok(vec![self.write_issue(issue)?])
    }

    /// Ids of every issue folder, sorted numerically.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the root cannot be read.
    pub fn ids(&self) -> Result<Vec<IssueId>> {
        let mut ids = Vec::new();
        if !self.root.is_dir() {
            return Ok(ids);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Ok(id) = IssueId::parse_with_prefix(&name, &self.prefix) {
                if self.exists(&id) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Every issue on the branch.
    ///
    /// # Errors
    ///
    /// Returns an error if any issue document cannot be decoded.
    pub fn all(&self) -> Result<Vec<Issue>> {
        self.ids()?.iter().map(|id| self.require(id)).collect()
    }

    /// Every issue that decodes cleanly, skipping unreadable documents
    /// (for example files holding conflict markers).
    ///
    /// # Errors
    ///
    /// Returns `Io` if the root cannot be read.
    pub fn all_readable(&self) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for id in self.ids()? {
            match self.get(&id) {
                Ok(Some(issue)) => issues.push(issue),
                Ok(None) => {}
                Err(e) => tracing::debug!(%id, error = %e, "skipping unreadable issue"),
            }
        }
        Ok(issues)
    }

    /// One page of issues (1-based `page`) and the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if a listed issue cannot be decoded.
    pub fn list(&self, page: usize, limit: usize) -> Result<IssuePage> {
        let ids = self.ids()?;
        let total = ids.len();
        let start = page.saturating_sub(1).saturating_mul(limit);
        let issues = ids
            .iter()
            .skip(start)
            .take(limit)
            .map(|id| self.require(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(IssuePage { issues, total })
    }

    // ========================================================================
    // Comments
    // ========================================================================

    /// The comment index for an issue (empty if none exists yet).
    ///
    /// # Errors
    ///
    /// Returns an error if the index exists but cannot be decoded.
    pub fn comment_index(&self, id: &IssueId) -> Result<CommentIndex> {
        Ok(document::read_optional(&self.index_path(id))?.unwrap_or_default())
    }

    /// Persist a comment index and return its path.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be written.
    pub fn write_index(&self, id: &IssueId, index: &CommentIndex) -> Result<PathBuf> {
        let path = self.index_path(id);
        document::write(&path, index)?;
        Ok(path)
    }

    /// Store a comment and append it to the issue's index.
    ///
    /// # Errors
    ///
    /// Returns `IssueNotFound` if the issue does not exist, `Validation` if
    /// the comment is empty or its truncated file name is already taken.
    pub fn add_comment(&self, id: &IssueId, comment: &Comment) -> Result<Vec<PathBuf>> {
        if comment.text.trim().is_empty() {
            return Err(IssueError::validation("comment", "cannot be empty"));
        }
        if !self.exists(id) {
            return Err(IssueError::IssueNotFound { id: id.to_string() });
        }

        let file_name = format!("{}.json", comment.short_uuid(self.layout.short_uuid_len));
        let comment_path = self.comments_dir(id).join(&file_name);
        if comment_path.exists() {
            return Err(IssueError::validation(
                "comment",
                format!("{file_name} already exists; retry to draw a new uuid"),
            ));
        }
        document::write(&comment_path, comment)?;

        let mut index = self.comment_index(id)?;
        index.add_entry(file_name, comment.date);
        let index_path = self.write_index(id, &index)?;

        tracing::debug!(%id, path = %comment_path.display(), "added comment");
        Ok(vec![comment_path, index_path])
    }

    /// Read comments `[offset, offset + limit)` in index order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidIndex` if the index names a comment file that does
    /// not exist.
    pub fn comments(&self, id: &IssueId, offset: usize, limit: usize) -> Result<Vec<Comment>> {
        let index = self.comment_index(id)?;
        let dir = self.comments_dir(id);
        index
            .page(offset, limit)
            .iter()
            .map(|entry| {
                let path = dir.join(&entry.path);
                if !path.is_file() {
                    return Err(IssueError::InvalidIndex {
                        folder: dir.clone(),
                        entry: entry.path.clone(),
                    });
                }
                document::read(&path)
            })
            .collect()
    }
}

/// Validate issue fields before they are written.
///
/// # Errors
///
/// Returns `Validation` naming the first offending field.
pub fn validate(issue: &Issue) -> Result<()> {
    if issue.summary.trim().is_empty() {
        return Err(IssueError::validation("summary", "cannot be empty"));
    }
    if issue.summary.len() > 500 {
        return Err(IssueError::validation("summary", "exceeds 500 characters"));
    }
    if let Some(description) = &issue.description {
        if description.len() > 102_400 {
            return Err(IssueError::validation("description", "exceeds 100KB"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Actor;
    use tempfile::TempDir;

    fn store() -> (TempDir, IssueStore) {
        let dir = TempDir::new().unwrap();
        let store = IssueStore::new(dir.path(), "ISSUE", Layout::default());
        (dir, store)
    }

    fn draft(summary: &str) -> Issue {
        Issue::new(IssueId::new("ISSUE", 0), summary)
    }

    #[test]
    fn test_create_allocates_sequential_ids() {
        let (_dir, store) = store();
        let (first, paths) = store.create(draft("first")).unwrap();
        let (second, _) = store.create(draft("second")).unwrap();

        assert_eq!(first.id.to_string(), "ISSUE-1");
        assert_eq!(second.id.to_string(), "ISSUE-2");
        assert_eq!(paths, vec![store.issue_path(&first.id), store.registry_path()]);

        let registry = store.load_registry().unwrap();
        assert_eq!(registry.issue_count, 2);
        assert_eq!(registry.resolve(second.uuid), Some(&second.id));
    }

    #[test]
    fn test_create_skips_occupied_ids() {
        let (_dir, store) = store();
        let squatter = Issue::new(IssueId::new("ISSUE", 1), "already here");
        store.write_issue(&squatter).unwrap();

        let (created, _) = store.create(draft("new")).unwrap();
        assert_eq!(created.id.to_string(), "ISSUE-2");
    }

    #[test]
    fn test_create_rejects_empty_summary() {
        let (_dir, store) = store();
        let err = store.create(draft("   ")).unwrap_err();
        assert!(matches!(err, IssueError::Validation { .. }));
    }

    #[test]
    fn test_missing_registry_is_empty() {
        let (_dir, store) = store();
        let registry = store.load_registry().unwrap();
        assert_eq!(registry.issue_count, 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_update_keeps_identity() {
        let (_dir, store) = store();
        let (mut issue, _) = store.create(draft("first")).unwrap();
        issue.summary = "renamed".to_string();
        store.update(&issue).unwrap();
        assert_eq!(store.require(&issue.id).unwrap().summary, "renamed");

        let mut impostor = issue.clone();
        impostor.uuid = Uuid::new_v4();
        assert!(store.update(&impostor).is_err());
    }

    #[test]
    fn test_get_by_uuid_checks_document() {
        let (_dir, store) = store();
        let (issue, _) = store.create(draft("first")).unwrap();
        let registry = store.load_registry().unwrap();
        assert_eq!(store.get_by_uuid(&registry, issue.uuid).unwrap(), Some(issue.clone()));

        let mut stale = registry;
        let other = Uuid::new_v4();
        stale.record(other, issue.id.clone());
        assert_eq!(store.get_by_uuid(&stale, other).unwrap(), None);
    }

    #[test]
    fn test_list_paginates_numerically() {
        let (_dir, store) = store();
        for i in 0..12 {
            store.create(draft(&format!("issue {i}"))).unwrap();
        }
        let page = store.list(2, 5).unwrap();
        assert_eq!(page.total, 12);
        let ids: Vec<String> = page.issues.iter().map(|i| i.id.to_string()).collect();
        assert_eq!(ids, vec!["ISSUE-6", "ISSUE-7", "ISSUE-8", "ISSUE-9", "ISSUE-10"]);
        assert!(store.list(4, 5).unwrap().issues.is_empty());
    }

    #[test]
    fn test_ids_ignore_foreign_folders() {
        let (dir, store) = store();
        store.create(draft("first")).unwrap();
        fs::create_dir_all(dir.path().join("notes")).unwrap();
        fs::create_dir_all(dir.path().join("ISSUE-9")).unwrap();
        assert_eq!(store.ids().unwrap().len(), 1);
    }

    #[test]
    fn test_comments_round_trip_through_index() {
        let (_dir, store) = store();
        let (issue, _) = store.create(draft("first")).unwrap();
        let author = Actor::new("a", "a@test.com");

        let first = Comment::new("one", author.clone());
        let second = Comment::new("two", author);
        store.add_comment(&issue.id, &first).unwrap();
        let paths = store.add_comment(&issue.id, &second).unwrap();
        assert_eq!(paths[1], store.index_path(&issue.id));

        let all = store.comments(&issue.id, 0, 10).unwrap();
        assert_eq!(all, vec![first, second.clone()]);
        assert_eq!(store.comments(&issue.id, 1, 10).unwrap(), vec![second]);
    }

    #[test]
    fn test_index_location_is_configurable() {
        let dir = TempDir::new().unwrap();
        let layout = Layout {
            index_location: IndexLocation::Issue,
            ..Layout::default()
        };
        let store = IssueStore::new(dir.path(), "ISSUE", layout);
        let id = IssueId::new("ISSUE", 3);
        assert_eq!(store.index_path(&id), dir.path().join("ISSUE-3").join("index.json"));
    }

    #[test]
    fn test_comment_on_missing_issue() {
        let (_dir, store) = store();
        let comment = Comment::new("hi", Actor::new("a", "a@test.com"));
        let err = store.add_comment(&IssueId::new("ISSUE", 1), &comment).unwrap_err();
        assert!(matches!(err, IssueError::IssueNotFound { .. }));
    }

    #[test]
    fn test_missing_comment_file_is_invalid_index() {
        let (_dir, store) = store();
        let (issue, _) = store.create(draft("first")).unwrap();
        let comment = Comment::new("hi", Actor::new("a", "a@test.com"));
        let paths = store.add_comment(&issue.id, &comment).unwrap();
        fs::remove_file(&paths[0]).unwrap();

        let err = store.comments(&issue.id, 0, 10).unwrap_err();
        match err {
            IssueError::InvalidIndex { folder, .. } => {
                assert_eq!(folder, store.comments_dir(&issue.id));
            }
            other => panic!("expected InvalidIndex, got {other:?}"),
        }
    }

    #[test]
    fn test_relative_paths() {
        let (dir, store) = store();
        let id = IssueId::new("ISSUE", 2);
        assert_eq!(
            store.relative(&store.issue_path(&id)),
            PathBuf::from("ISSUE-2").join("issue.json")
        );
        assert_eq!(store.absolute(Path::new("tracker.json")), dir.path().join("tracker.json"));
    }
}
